use std::collections::VecDeque;

use chrono::Utc;
use rand::Rng;

use crate::config::DifficultyParams;
use crate::types::{DifficultyAdjustment, DifficultyState};

/// Hard band around the base difficulty; every applied value is clamped into
/// `[base * BAND_LOWER, base * BAND_UPPER]`, not merely smoothed toward it.
const BAND_LOWER: f64 = 0.85;
const BAND_UPPER: f64 = 1.15;
const MICRO_STEP: f64 = 0.05;
const MICRO_HIGH: f64 = 0.8;
const MICRO_LOW: f64 = 0.2;
const ENCOUNTER_CLIP_LOW: f64 = 0.1;
const ENCOUNTER_CLIP_HIGH: f64 = 0.9;

/// Control loop steering global difficulty toward the target performance.
#[derive(Debug, Clone)]
pub struct DifficultyAdjustmentEngine {
    params: DifficultyParams,
    base_difficulty: f64,
    current_difficulty: f64,
    target_performance: f64,
    history: VecDeque<DifficultyAdjustment>,
}

impl DifficultyAdjustmentEngine {
    pub fn new(params: DifficultyParams) -> Self {
        Self {
            base_difficulty: params.base_difficulty,
            current_difficulty: params.base_difficulty,
            target_performance: params.target_performance,
            history: VecDeque::new(),
            params,
        }
    }

    /// Candidate difficulty for the observed performance, clamped to the band.
    ///
    /// Performance above target pulls the value down, below target pushes it
    /// up. Does not mutate state.
    pub fn calculate_difficulty_adjustment(&self, performance_score: f64) -> f64 {
        let perf = performance_score.max(0.01);
        let adjustment =
            self.base_difficulty * (0.7 + 0.3 * (self.target_performance / perf));
        self.clamp_to_band(adjustment)
    }

    /// Blends a candidate into the current difficulty by EMA and applies it.
    pub fn apply_statistical_smoothing(&mut self, new_value: f64, factor: f64) -> f64 {
        let factor = factor.clamp(0.0, 1.0);
        let smoothed = new_value * factor + self.current_difficulty * (1.0 - factor);
        self.apply(smoothed, "control_loop")
    }

    /// Nudge decision from the latest encounter outcomes, between full
    /// recalculations. An empty window never nudges.
    pub fn should_apply_micro_adjustment(&self, recent_encounters: &[bool]) -> (bool, f64) {
        if recent_encounters.is_empty() {
            return (false, 0.0);
        }
        let successes = recent_encounters.iter().filter(|&&s| s).count();
        let rate = successes as f64 / recent_encounters.len() as f64;
        if rate > MICRO_HIGH {
            (true, MICRO_STEP)
        } else if rate < MICRO_LOW {
            (true, -MICRO_STEP)
        } else {
            (false, 0.0)
        }
    }

    /// Shifts the current difficulty by a delta from an outside decision
    /// (micro adjustment, flow rebalance, intervention), band-clamped.
    pub fn apply_delta(&mut self, delta: f64, reason: &str) -> f64 {
        self.apply(self.current_difficulty + delta, reason)
    }

    /// Per-encounter difficulty drawn around the player's skill.
    pub fn generate_encounter_difficulty<R: Rng + ?Sized>(
        &self,
        player_skill: f64,
        rng: &mut R,
    ) -> f64 {
        let z = random_normal(rng);
        (player_skill + self.params.encounter_sigma * z)
            .clamp(ENCOUNTER_CLIP_LOW, ENCOUNTER_CLIP_HIGH)
    }

    /// Re-anchors both base and current difficulty, as when player skill is
    /// re-baselined out of band.
    pub fn rebaseline(&mut self, difficulty: f64) -> f64 {
        self.base_difficulty = difficulty.clamp(0.1, 1.0);
        self.apply(self.base_difficulty, "rebaseline")
    }

    pub fn current_difficulty(&self) -> f64 {
        self.current_difficulty
    }

    pub fn base_difficulty(&self) -> f64 {
        self.base_difficulty
    }

    pub fn snapshot(&self) -> DifficultyState {
        DifficultyState {
            base_difficulty: self.base_difficulty,
            current_difficulty: self.current_difficulty,
            target_performance: self.target_performance,
            history: self.history.iter().cloned().collect(),
        }
    }

    pub fn reset(&mut self) {
        self.base_difficulty = self.params.base_difficulty;
        self.current_difficulty = self.params.base_difficulty;
        self.target_performance = self.params.target_performance;
        self.history.clear();
    }

    fn clamp_to_band(&self, value: f64) -> f64 {
        value.clamp(
            self.base_difficulty * BAND_LOWER,
            self.base_difficulty * BAND_UPPER,
        )
    }

    fn apply(&mut self, value: f64, reason: &str) -> f64 {
        let clamped = self.clamp_to_band(value);
        if self.history.len() >= self.params.history_cap {
            self.history.pop_front();
        }
        self.history.push_back(DifficultyAdjustment {
            ts: Utc::now().timestamp_millis(),
            previous_difficulty: self.current_difficulty,
            new_difficulty: clamped,
            reason: reason.to_string(),
        });
        self.current_difficulty = clamped;
        clamped
    }
}

fn random_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-10);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
