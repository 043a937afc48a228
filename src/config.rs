use serde::{Deserialize, Serialize};

use crate::types::ScheduleType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceParams {
    /// Sliding window length for recent encounter outcomes.
    pub window_size: usize,
    /// Encounter duration (seconds) treated as fully inefficient.
    pub max_encounter_seconds: f64,
    /// Resource spend treated as fully inefficient.
    pub max_encounter_resources: f64,
    pub success_weight: f64,
    pub time_weight: f64,
    pub resource_weight: f64,
}

impl Default for PerformanceParams {
    fn default() -> Self {
        Self {
            window_size: 10,
            max_encounter_seconds: 60.0,
            max_encounter_resources: 100.0,
            success_weight: 0.4,
            time_weight: 0.3,
            resource_weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyParams {
    pub base_difficulty: f64,
    pub target_performance: f64,
    /// EMA factor blending recalculated difficulty into the current value.
    pub smoothing_factor: f64,
    /// Std deviation of per-encounter difficulty sampled around player skill.
    pub encounter_sigma: f64,
    pub history_cap: usize,
}

impl Default for DifficultyParams {
    fn default() -> Self {
        Self {
            base_difficulty: 0.5,
            target_performance: 0.75,
            smoothing_factor: 0.3,
            encounter_sigma: 0.15,
            history_cap: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowParams {
    /// EMA factor folding fresh skill signals into the skill estimate.
    pub skill_smoothing: f64,
    pub frustration_threshold: f64,
    pub failure_fraction_threshold: f64,
    /// Idle gap (seconds) counted as a flow disruption.
    pub idle_disruption_secs: f64,
    /// Minimum spacing between automatic challenge rebalances.
    pub rebalance_cooldown_secs: f64,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            skill_smoothing: 0.2,
            frustration_threshold: 0.7,
            failure_fraction_threshold: 0.7,
            idle_disruption_secs: 300.0,
            rebalance_cooldown_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardParams {
    pub schedule: ScheduleType,
    /// Inclusive bounds for the variable-ratio action threshold.
    pub min_ratio: u32,
    pub max_ratio: u32,
    /// Per-action grant probability under the flat schedule.
    pub flat_probability: f64,
    pub base_reward_value: f64,
    pub history_cap: usize,
}

impl Default for RewardParams {
    fn default() -> Self {
        Self {
            schedule: ScheduleType::VariableRatio,
            min_ratio: 2,
            max_ratio: 8,
            flat_probability: 0.25,
            base_reward_value: 50.0,
            history_cap: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarietyParams {
    /// Probability of recommending a uniformly random category.
    pub exploration_epsilon: f64,
    /// Exposure added to the tagged category per event.
    pub exposure_step: f64,
}

impl Default for VarietyParams {
    fn default() -> Self {
        Self {
            exploration_epsilon: 0.1,
            exposure_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementWeights {
    pub session_duration: f64,
    pub action_frequency: f64,
    pub success_rate: f64,
    pub exploration_rate: f64,
    pub social_interaction: f64,
    pub achievement_progress: f64,
}

impl EngagementWeights {
    pub fn sum(&self) -> f64 {
        self.session_duration
            + self.action_frequency
            + self.success_rate
            + self.exploration_rate
            + self.social_interaction
            + self.achievement_progress
    }
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            session_duration: 0.25,
            action_frequency: 0.20,
            success_rate: 0.15,
            exploration_rate: 0.15,
            social_interaction: 0.10,
            achievement_progress: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementParams {
    pub weights: EngagementWeights,
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub history_cap: usize,
    pub signal_history_cap: usize,
}

impl Default for EngagementParams {
    fn default() -> Self {
        Self {
            weights: EngagementWeights::default(),
            low_threshold: 0.3,
            high_threshold: 0.7,
            history_cap: 100,
            signal_history_cap: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionParams {
    /// Experience required to clear level 1.
    pub base_requirement: u64,
    /// Geometric growth applied per level past the first.
    pub growth_rate: f64,
    /// Practice units to reach mastery level 1.
    pub mastery_base_effort: f64,
    pub mastery_growth: f64,
    /// Spacing constant for the constant-perceived-effort schedule.
    pub perceived_k: f64,
    pub perceived_min_progress: f64,
}

impl Default for ProgressionParams {
    fn default() -> Self {
        Self {
            base_requirement: 100,
            growth_rate: 1.12,
            mastery_base_effort: 10.0,
            mastery_growth: 1.2,
            perceived_k: 0.3,
            perceived_min_progress: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionParams {
    /// Base-difficulty reduction applied by a difficulty intervention.
    pub difficulty_step: f64,
    /// Currency amount granted by a reward-bonus intervention.
    pub bonus_amount: f64,
}

impl Default for InterventionParams {
    fn default() -> Self {
        Self {
            difficulty_step: 0.1,
            bonus_amount: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionParams {
    /// Session length (minutes) scoring 1.0 on the duration factor.
    pub target_session_minutes: f64,
    /// Action rate scoring 1.0 on the frequency factor.
    pub target_actions_per_minute: f64,
    /// Frustration added per failed action.
    pub frustration_gain: f64,
    /// Multiplicative frustration decay per successful action.
    pub frustration_relief: f64,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            target_session_minutes: 30.0,
            target_actions_per_minute: 6.0,
            frustration_gain: 0.15,
            frustration_relief: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamificationConfig {
    pub performance: PerformanceParams,
    pub difficulty: DifficultyParams,
    pub flow: FlowParams,
    pub reward: RewardParams,
    pub variety: VarietyParams,
    pub engagement: EngagementParams,
    pub progression: ProgressionParams,
    pub intervention: InterventionParams,
    pub session: SessionParams,
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            performance: PerformanceParams::default(),
            difficulty: DifficultyParams::default(),
            flow: FlowParams::default(),
            reward: RewardParams::default(),
            variety: VarietyParams::default(),
            engagement: EngagementParams::default(),
            progression: ProgressionParams::default(),
            intervention: InterventionParams::default(),
            session: SessionParams::default(),
        }
    }
}

impl GamificationConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GAMIFICATION_REWARD_SCHEDULE") {
            if let Some(schedule) = ScheduleType::from_str(&val) {
                config.reward.schedule = schedule;
            }
        }
        if let Ok(val) = std::env::var("GAMIFICATION_BASE_DIFFICULTY") {
            config.difficulty.base_difficulty =
                val.parse().unwrap_or(0.5_f64).clamp(0.1, 0.9);
        }
        if let Ok(val) = std::env::var("GAMIFICATION_TARGET_PERFORMANCE") {
            config.difficulty.target_performance =
                val.parse().unwrap_or(0.75_f64).clamp(0.05, 1.0);
        }
        if let Ok(val) = std::env::var("GAMIFICATION_EXPLORATION_EPSILON") {
            config.variety.exploration_epsilon =
                val.parse().unwrap_or(0.1_f64).clamp(0.0, 1.0);
        }
        if let Ok(val) = std::env::var("GAMIFICATION_REBALANCE_COOLDOWN_SECS") {
            config.flow.rebalance_cooldown_secs = val.parse().unwrap_or(30.0_f64).max(0.0);
        }

        config
    }
}
