use std::collections::VecDeque;

use chrono::Utc;
use rand::Rng;

use crate::config::RewardParams;
use crate::types::{
    RewardEvent, RewardResponseAnalysis, RewardScheduleState, RewardSensitivity, ScheduleType,
};

const MOTIVATION_COEFFICIENT: f64 = 0.73;
const RARE_REWARD_CAP: f64 = 0.05;
const RARE_REWARD_TAU: f64 = 20.0;
const HIGH_SENSITIVITY: f64 = 10.0;
const LOW_SENSITIVITY: f64 = 2.0;

/// Reinforcement-style reward gate.
///
/// Under the variable-ratio schedule the gate fires once the action counter
/// reaches a threshold redrawn uniformly from the configured ratio window
/// after every grant. The flat schedule instead rolls an independent
/// per-action probability.
#[derive(Debug, Clone)]
pub struct RewardScheduler {
    params: RewardParams,
    action_count: u32,
    current_threshold: u32,
    last_reward_ts: Option<i64>,
    history: VecDeque<RewardEvent>,
}

impl RewardScheduler {
    pub fn new<R: Rng + ?Sized>(params: RewardParams, rng: &mut R) -> Self {
        let mut scheduler = Self {
            params,
            action_count: 0,
            current_threshold: 0,
            last_reward_ts: None,
            history: VecDeque::new(),
        };
        scheduler.current_threshold = scheduler.draw_threshold(rng);
        scheduler
    }

    /// Runs one qualifying action through the gate. Returns the granted
    /// reward when the gate fires.
    pub fn evaluate_action<R: Rng + ?Sized>(
        &mut self,
        success_probability: f64,
        context: &str,
        rng: &mut R,
    ) -> Option<RewardEvent> {
        self.action_count += 1;
        let fired = match self.params.schedule {
            ScheduleType::VariableRatio => self.action_count >= self.current_threshold,
            ScheduleType::FlatProbability => {
                rng.random::<f64>() < self.params.flat_probability
            }
        };
        if !fired {
            return None;
        }

        self.action_count = 0;
        if self.params.schedule == ScheduleType::VariableRatio {
            self.current_threshold = self.draw_threshold(rng);
        }
        let event = self.build_event(
            "action_reward",
            self.params.base_reward_value,
            context,
            success_probability,
            rng,
        );
        Some(event)
    }

    /// Records a grant decided outside the gate (e.g. an intervention bonus)
    /// without touching the schedule counters.
    pub fn grant_external<R: Rng + ?Sized>(
        &mut self,
        reward_type: &str,
        value: f64,
        context: &str,
        success_probability: f64,
        rng: &mut R,
    ) -> RewardEvent {
        self.build_event(reward_type, value, context, success_probability, rng)
    }

    /// Long-tail chance for a special drop layered on top of the base gate.
    pub fn calculate_rare_reward_probability(&self, n_encounters: u32) -> f64 {
        RARE_REWARD_CAP * (1.0 - (-(n_encounters as f64) / RARE_REWARD_TAU).exp())
    }

    /// Averages the motivation index over the reward history and bands it.
    ///
    /// With no grants yet the player reads as medium with no recommendation.
    pub fn analyze_player_response(&self) -> RewardResponseAnalysis {
        if self.history.is_empty() {
            return RewardResponseAnalysis {
                sensitivity: RewardSensitivity::Medium,
                average_motivation_index: 0.0,
                sample_count: 0,
                adjust_frequency: false,
            };
        }
        let average = self.history.iter().map(|e| e.motivation_index).sum::<f64>()
            / self.history.len() as f64;
        let sensitivity = Self::sensitivity_for(average);
        RewardResponseAnalysis {
            sensitivity,
            average_motivation_index: average,
            sample_count: self.history.len(),
            adjust_frequency: sensitivity == RewardSensitivity::Low,
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &RewardEvent> {
        self.history.iter()
    }

    pub fn schedule_state(&self) -> RewardScheduleState {
        RewardScheduleState {
            schedule_type: self.params.schedule,
            last_reward_ts: self.last_reward_ts,
            action_count: self.action_count,
            current_threshold: self.current_threshold,
        }
    }

    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.action_count = 0;
        self.current_threshold = self.draw_threshold(rng);
        self.last_reward_ts = None;
        self.history.clear();
    }

    fn sensitivity_for(average_motivation_index: f64) -> RewardSensitivity {
        if average_motivation_index > HIGH_SENSITIVITY {
            RewardSensitivity::High
        } else if average_motivation_index < LOW_SENSITIVITY {
            RewardSensitivity::Low
        } else {
            RewardSensitivity::Medium
        }
    }

    fn draw_threshold<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let lo = self.params.min_ratio.max(1);
        let hi = self.params.max_ratio.max(lo);
        rng.random_range(lo..=hi)
    }

    fn build_event<R: Rng + ?Sized>(
        &mut self,
        reward_type: &str,
        value: f64,
        context: &str,
        success_probability: f64,
        rng: &mut R,
    ) -> RewardEvent {
        let prediction_error = (1.0 - success_probability.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        let novelty_factor: f64 = rng.random();
        let motivation_index = prediction_error * novelty_factor * MOTIVATION_COEFFICIENT;
        let ts = Utc::now().timestamp_millis();
        let event = RewardEvent {
            ts,
            reward_type: reward_type.to_string(),
            value,
            context: context.to_string(),
            prediction_error,
            novelty_factor,
            motivation_index,
            received_reward: true,
        };
        self.last_reward_ts = Some(ts);
        if self.history.len() >= self.params.history_cap {
            self.history.pop_front();
        }
        self.history.push_back(event.clone());
        event
    }
}
