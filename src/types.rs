use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Fixed set of content categories the variety optimizer rotates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Combat,
    Exploration,
    Puzzle,
    Social,
    Narrative,
    Crafting,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 6] = [
        Self::Combat,
        Self::Exploration,
        Self::Puzzle,
        Self::Social,
        Self::Narrative,
        Self::Crafting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Combat => "combat",
            Self::Exploration => "exploration",
            Self::Puzzle => "puzzle",
            Self::Social => "social",
            Self::Narrative => "narrative",
            Self::Crafting => "crafting",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "combat" => Some(Self::Combat),
            "exploration" => Some(Self::Exploration),
            "puzzle" => Some(Self::Puzzle),
            "social" => Some(Self::Social),
            "narrative" => Some(Self::Narrative),
            "crafting" => Some(Self::Crafting),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum ScheduleType {
    #[default]
    VariableRatio,
    FlatProbability,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VariableRatio => "variable_ratio",
            Self::FlatProbability => "flat_probability",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "variable_ratio" | "variable" => Some(Self::VariableRatio),
            "flat_probability" | "flat" => Some(Self::FlatProbability),
            _ => None,
        }
    }
}

/// One discrete player action reported by the host game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerActionEvent {
    pub action_type: String,
    pub success: bool,
    /// Encounter duration in seconds.
    pub time_taken: f64,
    /// Difficulty the encounter actually ran at, when the host reports it.
    #[serde(default)]
    pub difficulty: Option<f64>,
    /// Consumables spent during the encounter.
    #[serde(default)]
    pub resources_used: f64,
    /// Fraction of health lost, in [0, 1].
    #[serde(default)]
    pub damage_taken: Option<f64>,
    #[serde(default)]
    pub content_category: Option<String>,
    /// Event time in epoch milliseconds; the engine clock is used when absent.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Host-private payload; carried through untouched, never interpreted.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl PlayerActionEvent {
    /// Rejects events whose required fields are missing or out of range.
    pub fn validate(&self) -> EngineResult<()> {
        if self.action_type.trim().is_empty() {
            return Err(EngineError::InvalidEventShape(
                "actionType must be non-empty".to_string(),
            ));
        }
        if !self.time_taken.is_finite() || self.time_taken < 0.0 {
            return Err(EngineError::InvalidEventShape(
                "timeTaken must be a non-negative finite number".to_string(),
            ));
        }
        if !self.resources_used.is_finite() || self.resources_used < 0.0 {
            return Err(EngineError::InvalidEventShape(
                "resourcesUsed must be a non-negative finite number".to_string(),
            ));
        }
        if let Some(difficulty) = self.difficulty {
            if !difficulty.is_finite() || difficulty < 0.0 {
                return Err(EngineError::InvalidEventShape(
                    "difficulty must be a non-negative finite number".to_string(),
                ));
            }
        }
        if let Some(damage) = self.damage_taken {
            if !damage.is_finite() || !(0.0..=1.0).contains(&damage) {
                return Err(EngineError::InvalidEventShape(
                    "damageTaken must lie in [0, 1]".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Resolves the optional category label against the fixed enumeration.
    pub fn parsed_category(&self) -> EngineResult<Option<ContentCategory>> {
        match &self.content_category {
            None => Ok(None),
            Some(raw) => ContentCategory::from_str(raw)
                .map(Some)
                .ok_or_else(|| EngineError::UnknownContentCategory(raw.clone())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub success_rate: f64,
    pub time_efficiency: f64,
    pub resource_efficiency: f64,
    pub overall_score: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyAdjustment {
    pub ts: i64,
    pub previous_difficulty: f64,
    pub new_difficulty: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyState {
    pub base_difficulty: f64,
    pub current_difficulty: f64,
    pub target_performance: f64,
    pub history: Vec<DifficultyAdjustment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStateMetrics {
    pub skill_level: f64,
    pub challenge_level: f64,
    pub challenge_skill_ratio: f64,
    pub anxiety_score: f64,
    pub boredom_score: f64,
    pub flow_score: f64,
    pub in_flow_state: bool,
}

impl Default for FlowStateMetrics {
    fn default() -> Self {
        Self {
            skill_level: 0.5,
            challenge_level: 0.5,
            challenge_skill_ratio: 1.0,
            anxiety_score: 0.0,
            boredom_score: 0.0,
            flow_score: 0.0,
            in_flow_state: false,
        }
    }
}

/// A granted reward together with the signals that produced it.
///
/// Only created when the gate fires, so `received_reward` is always true for
/// entries in the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardEvent {
    pub ts: i64,
    pub reward_type: String,
    pub value: f64,
    pub context: String,
    pub prediction_error: f64,
    pub novelty_factor: f64,
    pub motivation_index: f64,
    pub received_reward: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardSensitivity {
    Low,
    Medium,
    High,
}

impl RewardSensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardResponseAnalysis {
    pub sensitivity: RewardSensitivity,
    pub average_motivation_index: f64,
    pub sample_count: usize,
    pub adjust_frequency: bool,
}

/// Counters behind the reinforcement gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardScheduleState {
    pub schedule_type: ScheduleType,
    pub last_reward_ts: Option<i64>,
    pub action_count: u32,
    pub current_threshold: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    Low,
    Medium,
    High,
}

impl EngagementLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Optional behavioral readings supplied by the host alongside events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSignals {
    pub actions_per_minute: Option<f64>,
    pub decision_accuracy: Option<f64>,
    pub error_rate: Option<f64>,
    pub enjoyment: Option<f64>,
    pub frustration: Option<f64>,
    pub motivation: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSnapshot {
    pub current_score: f64,
    pub engagement_level: EngagementLevel,
    pub history: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnRiskAnalysis {
    pub churn_probability: f64,
    pub risk_level: RiskLevel,
    pub model_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionType {
    DifficultyReduction,
    ContentRecommendation,
    RewardBonus,
    AchievementMilestone,
}

impl InterventionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DifficultyReduction => "difficulty_reduction",
            Self::ContentRecommendation => "content_recommendation",
            Self::RewardBonus => "reward_bonus",
            Self::AchievementMilestone => "achievement_milestone",
        }
    }
}

/// Player state visible to the dispatcher when choosing a remediation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InterventionContext {
    pub current_difficulty: f64,
    pub engagement_score: f64,
    pub churn_probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_category: Option<ContentCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionOutcome {
    pub intervention_type: InterventionType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_category: Option<ContentCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionRecord {
    pub ts: i64,
    pub intervention_type: InterventionType,
    pub context: InterventionContext,
    pub outcome: InterventionOutcome,
}

/// Durable per-player progression state, round-tripped through the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub player_id: String,
    pub level: u32,
    pub experience: u64,
    pub unlocked_achievements: Vec<String>,
}

impl ProgressRecord {
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            level: 1,
            experience: 0,
            unlocked_achievements: Vec::new(),
        }
    }
}

/// Outcome of crediting experience, after the level loop settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpReport {
    pub old_level: u32,
    pub new_level: u32,
    pub levels_gained: u32,
    /// Experience left over inside the new level.
    pub total_experience: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDetails {
    pub reward_type: String,
    pub amount: f64,
    pub motivation_index: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionFactor {
    pub name: String,
    pub value: f64,
    pub impact: String,
}

/// Human-readable account of one processing pass.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DecisionNotes {
    pub factors: Vec<DecisionFactor>,
    pub changes: Vec<String>,
    pub text: String,
}

/// Aggregate outcome of processing one player action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionProcessingResult {
    pub performance_score: f64,
    pub difficulty_adjusted: bool,
    pub new_difficulty: f64,
    pub reward_given: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_details: Option<RewardDetails>,
    pub flow_disruption_detected: bool,
    pub engagement_score: BTreeMap<String, f64>,
    pub intervention_triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervention_result: Option<InterventionOutcome>,
    pub explanation: DecisionNotes,
}

/// Cross-component view of one player, assembled on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAnalytics {
    pub player_id: String,
    pub performance: PerformanceMetrics,
    pub difficulty: DifficultyState,
    pub flow: FlowStateMetrics,
    pub engagement: EngagementSnapshot,
    pub churn_risk: ChurnRiskAnalysis,
    pub content_exposure: BTreeMap<String, f64>,
    pub reward_response: RewardResponseAnalysis,
    pub progress: ProgressRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityManifest {
    pub name: String,
    pub version: String,
    pub schedule: ScheduleType,
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatistics {
    pub events_processed: u64,
    pub rewards_granted: u64,
    pub interventions_triggered: u64,
    pub rebalances_applied: u64,
    pub micro_adjustments_applied: u64,
    pub levels_gained: u64,
    pub experience_awarded: u64,
}
