use chrono::Utc;

use crate::config::FlowParams;
use crate::types::FlowStateMetrics;

/// Performance signals for one flow update.
#[derive(Debug, Clone, Copy)]
pub struct FlowFeatures {
    pub success_rate: f64,
    /// Fraction of health lost, in [0, 1].
    pub damage_taken: f64,
}

/// Session-level signals consulted by the disruption check.
#[derive(Debug, Clone, Copy)]
pub struct SessionSnapshot {
    pub frustration_level: f64,
    pub recent_failure_fraction: f64,
    pub idle_seconds: f64,
}

/// Tracks the challenge-to-skill balance and scores how close the player sits
/// to the flow channel.
///
/// The ratio bands are fixed: below 0.8 reads as boredom, above 1.2 as
/// anxiety, and [0.9, 1.1] is the full-flow channel.
#[derive(Debug, Clone)]
pub struct FlowStateOptimizer {
    params: FlowParams,
    metrics: FlowStateMetrics,
    last_rebalance_ts: Option<i64>,
}

const REBALANCE_STEP: f64 = 0.05;
const LOW_RATIO: f64 = 0.8;
const HIGH_RATIO: f64 = 1.2;
const FLOW_BAND_LOW: f64 = 0.9;
const FLOW_BAND_HIGH: f64 = 1.1;
const IN_FLOW_THRESHOLD: f64 = 0.7;
const OPTIMAL_CHALLENGE_DIVISOR: f64 = 1.05;

impl FlowStateOptimizer {
    pub fn new(params: FlowParams) -> Self {
        Self {
            params,
            metrics: FlowStateMetrics::default(),
            last_rebalance_ts: None,
        }
    }

    /// Folds one performance sample into the skill estimate and recomputes
    /// every flow metric against the supplied difficulty.
    pub fn update_metrics(&mut self, features: FlowFeatures, current_difficulty: f64) {
        let survival = (1.0 - features.damage_taken).max(0.0);
        let skill_signal =
            (0.7 * features.success_rate.clamp(0.0, 1.0) + 0.3 * survival).clamp(0.0, 1.0);
        let alpha = self.params.skill_smoothing;
        self.metrics.skill_level =
            ((1.0 - alpha) * self.metrics.skill_level + alpha * skill_signal).clamp(0.0, 1.0);
        self.metrics.challenge_level = current_difficulty.clamp(0.0, 1.0);
        self.recompute_ratio_scores();
    }

    fn recompute_ratio_scores(&mut self) {
        let ratio = self.metrics.challenge_level / self.metrics.skill_level.max(0.1);
        self.metrics.challenge_skill_ratio = ratio;

        if ratio > HIGH_RATIO {
            self.metrics.anxiety_score = ((ratio - HIGH_RATIO) * 2.0).min(1.0);
            self.metrics.boredom_score = 0.0;
        } else if ratio < LOW_RATIO {
            self.metrics.boredom_score = ((LOW_RATIO - ratio) * 2.0).min(1.0);
            self.metrics.anxiety_score = 0.0;
        } else {
            self.metrics.anxiety_score = 0.0;
            self.metrics.boredom_score = 0.0;
        }

        self.metrics.flow_score = if (FLOW_BAND_LOW..=FLOW_BAND_HIGH).contains(&ratio) {
            1.0
        } else if ratio < FLOW_BAND_LOW {
            ratio / FLOW_BAND_LOW
        } else {
            (1.0 - (ratio - FLOW_BAND_HIGH)).max(0.0)
        };
        self.metrics.in_flow_state = self.metrics.flow_score > IN_FLOW_THRESHOLD;
    }

    /// True when frustration, the recent failure fraction, or the idle gap
    /// crosses its configured threshold.
    pub fn detect_flow_disruption(&self, session: &SessionSnapshot) -> bool {
        session.frustration_level > self.params.frustration_threshold
            || session.recent_failure_fraction > self.params.failure_fraction_threshold
            || session.idle_seconds > self.params.idle_disruption_secs
    }

    /// Nudges the supplied difficulty when the ratio has left the flow band.
    ///
    /// Rate limited: a second call inside the cooldown window returns the
    /// difficulty unchanged. An in-band call is a no-op and does not consume
    /// the cooldown.
    pub fn auto_rebalance(&mut self, current_difficulty: f64) -> f64 {
        let now = Utc::now().timestamp_millis();
        if let Some(last) = self.last_rebalance_ts {
            let elapsed_secs = (now - last) as f64 / 1000.0;
            if elapsed_secs < self.params.rebalance_cooldown_secs {
                return current_difficulty;
            }
        }

        let ratio = self.metrics.challenge_skill_ratio;
        let delta = if ratio < FLOW_BAND_LOW {
            -REBALANCE_STEP
        } else if ratio > HIGH_RATIO {
            REBALANCE_STEP
        } else {
            return current_difficulty;
        };
        self.last_rebalance_ts = Some(now);
        current_difficulty + delta
    }

    /// Direct target-difficulty estimate from an externally supplied skill,
    /// bypassing the EMA path.
    pub fn calculate_optimal_difficulty(&self, skill: f64) -> f64 {
        skill.clamp(0.0, 1.0) / OPTIMAL_CHALLENGE_DIVISOR
    }

    /// Re-baselines the skill estimate, as for a returning player whose level
    /// is known out of band.
    pub fn set_skill(&mut self, skill: f64) {
        self.metrics.skill_level = skill.clamp(0.0, 1.0);
        self.recompute_ratio_scores();
    }

    pub fn metrics(&self) -> &FlowStateMetrics {
        &self.metrics
    }

    pub fn snapshot(&self) -> FlowStateMetrics {
        self.metrics.clone()
    }

    pub fn reset(&mut self) {
        self.metrics = FlowStateMetrics::default();
        self.last_rebalance_ts = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimizer_with_cooldown(cooldown: f64) -> FlowStateOptimizer {
        FlowStateOptimizer::new(FlowParams {
            rebalance_cooldown_secs: cooldown,
            ..FlowParams::default()
        })
    }

    #[test]
    fn test_balanced_ratio_scores_full_flow() {
        let mut optimizer = FlowStateOptimizer::new(FlowParams::default());
        // Signal 0.7*0.5 + 0.3*0.5 = 0.5 keeps the default skill at 0.5.
        optimizer.update_metrics(
            FlowFeatures {
                success_rate: 0.5,
                damage_taken: 0.5,
            },
            0.5,
        );
        let metrics = optimizer.metrics();
        assert!((metrics.challenge_skill_ratio - 1.0).abs() < 1e-9);
        assert_eq!(metrics.flow_score, 1.0);
        assert!(metrics.in_flow_state);
        assert_eq!(metrics.anxiety_score, 0.0);
        assert_eq!(metrics.boredom_score, 0.0);
    }

    #[test]
    fn test_overwhelming_challenge_reads_as_anxiety() {
        let mut optimizer = FlowStateOptimizer::new(FlowParams::default());
        optimizer.set_skill(0.1);
        optimizer.update_metrics(
            FlowFeatures {
                success_rate: 0.0,
                damage_taken: 1.0,
            },
            0.9,
        );
        let metrics = optimizer.metrics();
        assert!(metrics.challenge_skill_ratio > HIGH_RATIO);
        assert_eq!(metrics.anxiety_score, 1.0);
        assert_eq!(metrics.boredom_score, 0.0);
        assert_eq!(metrics.flow_score, 0.0);
        assert!(!metrics.in_flow_state);
    }

    #[test]
    fn test_trivial_challenge_reads_as_boredom() {
        let mut optimizer = FlowStateOptimizer::new(FlowParams::default());
        optimizer.set_skill(1.0);
        // Signal 1.0 keeps skill pinned at 1.0.
        optimizer.update_metrics(
            FlowFeatures {
                success_rate: 1.0,
                damage_taken: 0.0,
            },
            0.2,
        );
        let metrics = optimizer.metrics();
        assert!((metrics.challenge_skill_ratio - 0.2).abs() < 1e-9);
        assert_eq!(metrics.boredom_score, 1.0);
        assert_eq!(metrics.anxiety_score, 0.0);
        assert!((metrics.flow_score - 0.2 / 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_skill_moves_by_ema_weight() {
        let mut optimizer = FlowStateOptimizer::new(FlowParams::default());
        optimizer.update_metrics(
            FlowFeatures {
                success_rate: 1.0,
                damage_taken: 0.0,
            },
            0.5,
        );
        // 0.8 * 0.5 + 0.2 * 1.0
        assert!((optimizer.metrics().skill_level - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_disruption_thresholds() {
        let optimizer = FlowStateOptimizer::new(FlowParams::default());
        let calm = SessionSnapshot {
            frustration_level: 0.2,
            recent_failure_fraction: 0.3,
            idle_seconds: 10.0,
        };
        assert!(!optimizer.detect_flow_disruption(&calm));

        assert!(optimizer.detect_flow_disruption(&SessionSnapshot {
            frustration_level: 0.8,
            ..calm
        }));
        assert!(optimizer.detect_flow_disruption(&SessionSnapshot {
            recent_failure_fraction: 0.8,
            ..calm
        }));
        assert!(optimizer.detect_flow_disruption(&SessionSnapshot {
            idle_seconds: 301.0,
            ..calm
        }));
    }

    #[test]
    fn test_rebalance_shifts_out_of_band_ratio() {
        let mut optimizer = optimizer_with_cooldown(0.0);
        optimizer.set_skill(1.0);
        optimizer.update_metrics(
            FlowFeatures {
                success_rate: 1.0,
                damage_taken: 0.0,
            },
            0.2,
        );
        let shifted = optimizer.auto_rebalance(0.2);
        assert!((shifted - 0.15).abs() < 1e-9);

        optimizer.set_skill(0.1);
        let shifted = optimizer.auto_rebalance(0.9);
        assert!((shifted - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_rebalance_noop_inside_band() {
        let mut optimizer = optimizer_with_cooldown(0.0);
        optimizer.update_metrics(
            FlowFeatures {
                success_rate: 0.5,
                damage_taken: 0.5,
            },
            0.5,
        );
        assert_eq!(optimizer.auto_rebalance(0.5), 0.5);
    }

    #[test]
    fn test_rebalance_respects_cooldown() {
        let mut optimizer = optimizer_with_cooldown(3600.0);
        optimizer.set_skill(1.0);
        optimizer.update_metrics(
            FlowFeatures {
                success_rate: 1.0,
                damage_taken: 0.0,
            },
            0.2,
        );
        let first = optimizer.auto_rebalance(0.2);
        assert!((first - 0.15).abs() < 1e-9);
        // Second call lands inside the window and must not shift again.
        assert_eq!(optimizer.auto_rebalance(first), first);
    }

    #[test]
    fn test_optimal_difficulty_tracks_skill() {
        let optimizer = FlowStateOptimizer::new(FlowParams::default());
        assert!((optimizer.calculate_optimal_difficulty(0.84) - 0.8).abs() < 1e-9);
        assert!(optimizer.calculate_optimal_difficulty(1.0) < 1.0);
        assert_eq!(optimizer.calculate_optimal_difficulty(0.0), 0.0);
    }

    #[test]
    fn test_flow_score_stays_in_unit_interval() {
        let mut optimizer = FlowStateOptimizer::new(FlowParams::default());
        for challenge in [0.0, 0.1, 0.3, 0.5, 0.7, 0.9, 1.0] {
            for skill in [0.0, 0.2, 0.5, 0.8, 1.0] {
                optimizer.set_skill(skill);
                optimizer.update_metrics(
                    FlowFeatures {
                        success_rate: skill,
                        damage_taken: 1.0 - skill,
                    },
                    challenge,
                );
                let metrics = optimizer.metrics();
                assert!((0.0..=1.0).contains(&metrics.flow_score));
                assert!((0.0..=1.0).contains(&metrics.anxiety_score));
                assert!((0.0..=1.0).contains(&metrics.boredom_score));
            }
        }
    }
}
