use std::collections::VecDeque;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::config::GamificationConfig;
use crate::decision::{
    ContentVarietyOptimizer, DifficultyAdjustmentEngine, InterventionDispatcher, RewardScheduler,
};
use crate::error::EngineResult;
use crate::modeling::engagement::EngagementFactors;
use crate::modeling::flow::{FlowFeatures, SessionSnapshot};
use crate::modeling::performance::EncounterOutcome;
use crate::modeling::{
    EngagementAnalyzer, FlowStateOptimizer, PerformanceTracker, ProgressionCurve,
};
use crate::store::EngineStores;
use crate::types::*;

const MILESTONE_INTERVAL: u32 = 5;
const EXPLORED_THRESHOLD: f64 = 0.05;
const INTERVENTION_LOG_CAP: usize = 100;

const COMPONENT_NAMES: [&str; 8] = [
    "performance_tracker",
    "difficulty_adjustment",
    "flow_state",
    "reward_scheduler",
    "content_variety",
    "engagement_analyzer",
    "intervention_dispatcher",
    "progression_curve",
];

/// Per-session activity counters feeding frustration and idle tracking.
///
/// The session clock runs on event timestamps and anchors at the first
/// observed action, so replayed histories and late-started sessions measure
/// spacing between events, not distance from construction.
struct SessionActivity {
    session_start_ts: i64,
    last_action_ts: i64,
    actions_this_session: u64,
    frustration_level: f64,
}

impl SessionActivity {
    fn new() -> Self {
        Self {
            session_start_ts: 0,
            last_action_ts: 0,
            actions_this_session: 0,
            frustration_level: 0.0,
        }
    }

    /// Folds one action in and returns the idle gap that preceded it. The
    /// first action of a session never reports an idle gap.
    fn observe(&mut self, relief: f64, gain: f64, success: bool, now: i64) -> f64 {
        if self.actions_this_session == 0 {
            self.session_start_ts = now;
            self.last_action_ts = now;
        }
        let idle_seconds = (now - self.last_action_ts).max(0) as f64 / 1000.0;
        self.last_action_ts = now;
        self.actions_this_session += 1;
        if success {
            self.frustration_level *= relief;
        } else {
            self.frustration_level = (self.frustration_level + gain).min(1.0);
        }
        idle_seconds
    }

    fn session_minutes(&self, now: i64) -> f64 {
        if self.actions_this_session == 0 {
            return 0.0;
        }
        (now - self.session_start_ts).max(0) as f64 / 60_000.0
    }

    fn actions_per_minute(&self, now: i64) -> f64 {
        // Floor the elapsed time at one second so early-session rates stay
        // finite.
        self.actions_this_session as f64 / self.session_minutes(now).max(1.0 / 60.0)
    }
}

/// Facade owning one player's adaptive state and sequencing every component
/// per incoming action.
///
/// Construction is explicit: the caller owns the engine, its stores, and its
/// randomness. One engine serves exactly one player; concurrent callers must
/// serialize access per player id themselves.
pub struct GamificationEngine {
    player_id: String,
    config: GamificationConfig,
    tracker: PerformanceTracker,
    difficulty: DifficultyAdjustmentEngine,
    flow: FlowStateOptimizer,
    rewards: RewardScheduler,
    variety: ContentVarietyOptimizer,
    engagement: EngagementAnalyzer,
    dispatcher: InterventionDispatcher,
    progression: ProgressionCurve,
    stores: EngineStores,
    rng: Box<dyn RngCore + Send>,
    session: SessionActivity,
    interventions: VecDeque<InterventionRecord>,
    stats: SystemStatistics,
    encounters_seen: u32,
}

impl GamificationEngine {
    pub fn new(
        player_id: impl Into<String>,
        config: GamificationConfig,
        stores: EngineStores,
    ) -> Self {
        Self::with_rng(player_id, config, stores, Box::new(StdRng::from_os_rng()))
    }

    /// Injects the random source, letting tests run fully deterministic.
    pub fn with_rng(
        player_id: impl Into<String>,
        config: GamificationConfig,
        stores: EngineStores,
        mut rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let rewards = RewardScheduler::new(config.reward.clone(), &mut *rng);
        Self {
            player_id: player_id.into(),
            tracker: PerformanceTracker::new(config.performance.clone()),
            difficulty: DifficultyAdjustmentEngine::new(config.difficulty.clone()),
            flow: FlowStateOptimizer::new(config.flow.clone()),
            rewards,
            variety: ContentVarietyOptimizer::new(config.variety.clone()),
            engagement: EngagementAnalyzer::new(config.engagement.clone()),
            dispatcher: InterventionDispatcher::new(config.intervention.clone()),
            progression: ProgressionCurve::new(config.progression.clone()),
            stores,
            rng,
            session: SessionActivity::new(),
            interventions: VecDeque::new(),
            stats: SystemStatistics::default(),
            encounters_seen: 0,
            config,
        }
    }

    /// Creates the player's progress record if missing and reports what this
    /// engine build supports.
    pub fn initialize(&mut self) -> EngineResult<CapabilityManifest> {
        self.ensure_progress_record()?;
        tracing::info!(player_id = %self.player_id, "gamification engine initialized");
        Ok(CapabilityManifest {
            name: "gamification-core".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            schedule: self.config.reward.schedule,
            components: COMPONENT_NAMES.iter().map(|c| c.to_string()).collect(),
        })
    }

    /// Runs one player action through the full pipeline.
    ///
    /// Rejected events (bad shape, unknown category) leave every component
    /// untouched. Reward rows are persisted only after the progress record
    /// saves, so a failed call adds nothing to the stores or the counters.
    pub fn process_player_action(
        &mut self,
        event: &PlayerActionEvent,
    ) -> EngineResult<ActionProcessingResult> {
        event.validate()?;
        let category = event.parsed_category()?;
        let now = event
            .timestamp
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        let record = self.ensure_progress_record()?;

        let idle_seconds = self.session.observe(
            self.config.session.frustration_relief,
            self.config.session.frustration_gain,
            event.success,
            now,
        );

        // Performance window.
        self.tracker.record(EncounterOutcome {
            success: event.success,
            time_taken: event.time_taken,
            resources_used: event.resources_used,
        });
        self.encounters_seen = self.encounters_seen.saturating_add(1);
        let metrics = self.tracker.metrics();
        let performance_score = metrics.overall_score;

        // Difficulty control loop: recalculate, smooth, maybe nudge.
        let previous_difficulty = self.difficulty.current_difficulty();
        let candidate = self
            .difficulty
            .calculate_difficulty_adjustment(performance_score);
        self.difficulty
            .apply_statistical_smoothing(candidate, self.config.difficulty.smoothing_factor);
        let recent = self.tracker.recent_outcomes(self.config.performance.window_size);
        let (nudge, nudge_delta) = self.difficulty.should_apply_micro_adjustment(&recent);
        if nudge {
            self.difficulty.apply_delta(nudge_delta, "micro_adjustment");
            self.stats.micro_adjustments_applied += 1;
        }

        // Flow metrics from the same performance sample.
        self.flow.update_metrics(
            FlowFeatures {
                success_rate: metrics.success_rate,
                damage_taken: event.damage_taken.unwrap_or(0.0),
            },
            self.difficulty.current_difficulty(),
        );
        let snapshot = SessionSnapshot {
            frustration_level: self.session.frustration_level,
            recent_failure_fraction: self.tracker.failure_fraction(),
            idle_seconds,
        };
        let flow_disruption_detected = self.flow.detect_flow_disruption(&snapshot);

        let before_rebalance = self.difficulty.current_difficulty();
        let rebalanced = self.flow.auto_rebalance(before_rebalance);
        if (rebalanced - before_rebalance).abs() > f64::EPSILON {
            self.difficulty
                .apply_delta(rebalanced - before_rebalance, "flow_rebalance");
            self.stats.rebalances_applied += 1;
        }

        // Reward gate. The row lands after the progress save below.
        let reward_event =
            self.rewards
                .evaluate_action(metrics.success_rate, &event.action_type, &mut *self.rng);
        let reward_details = reward_event.as_ref().map(|granted| RewardDetails {
            reward_type: granted.reward_type.clone(),
            amount: granted.value,
            motivation_index: granted.motivation_index,
        });

        // Content exposure for tagged events.
        if let Some(category) = category {
            let step = self.variety.exposure_step();
            self.variety.update_content_exposure(category, step);
        }

        // Engagement factors are derived from session and component state.
        let factors = self.derive_engagement_factors(&record, &metrics, now);
        let overall_engagement = self.engagement.calculate_score(&factors);
        let churn = self.engagement.predict_churn_risk();

        // Possibly intervene, then apply the outcome.
        let (intervention_result, bonus_event) = match self.engagement.should_trigger_intervention()
        {
            Some(suggested) => {
                let (outcome, bonus) =
                    self.run_intervention(suggested, churn.churn_probability, now);
                (Some(outcome), bonus)
            }
            None => (None, None),
        };
        let intervention_triggered = intervention_result.is_some();

        self.save_progress(&record)?;

        for granted in reward_event.iter().chain(bonus_event.iter()) {
            self.stores
                .rewards
                .add(&self.player_id, granted)
                .map_err(|e| {
                    tracing::warn!(error = %e, player_id = %self.player_id, "failed to persist reward");
                    e
                })?;
            self.stats.rewards_granted += 1;
        }
        self.stats.events_processed += 1;

        let new_difficulty = self.difficulty.current_difficulty();
        let difficulty_adjusted = (new_difficulty - previous_difficulty).abs() > f64::EPSILON;
        let explanation = self.build_explanation(
            event,
            performance_score,
            previous_difficulty,
            new_difficulty,
            &reward_details,
            &churn,
            intervention_result.as_ref(),
        );

        tracing::debug!(
            player_id = %self.player_id,
            performance = performance_score,
            difficulty = new_difficulty,
            engagement = overall_engagement,
            "processed player action"
        );

        Ok(ActionProcessingResult {
            performance_score,
            difficulty_adjusted,
            new_difficulty,
            reward_given: reward_details.is_some(),
            reward_details,
            flow_disruption_detected,
            engagement_score: self.engagement.score_breakdown(),
            intervention_triggered,
            intervention_result,
            explanation,
        })
    }

    /// Cross-component snapshot for dashboards and debugging.
    pub fn get_player_analytics(&mut self) -> EngineResult<PlayerAnalytics> {
        let record = self.ensure_progress_record()?;
        Ok(PlayerAnalytics {
            player_id: self.player_id.clone(),
            performance: self.tracker.metrics(),
            difficulty: self.difficulty.snapshot(),
            flow: self.flow.snapshot(),
            engagement: self.engagement.snapshot(),
            churn_risk: self.engagement.predict_churn_risk(),
            content_exposure: self.variety.exposure_map(),
            reward_response: self.rewards.analyze_player_response(),
            progress: record,
        })
    }

    /// Re-baselines skill from an out-of-band source and re-anchors the
    /// difficulty band on the matching optimal challenge.
    pub fn update_player_skill(&mut self, skill: f64) -> f64 {
        self.flow.set_skill(skill);
        let optimal = self.flow.calculate_optimal_difficulty(skill);
        let applied = self.difficulty.rebaseline(optimal);
        tracing::info!(
            player_id = %self.player_id,
            skill,
            difficulty = applied,
            "player skill re-baselined"
        );
        applied
    }

    /// Credits experience and advances levels while thresholds are cleared.
    /// Crossing a milestone level also unlocks an achievement. Levels stop at
    /// the curve cap; residual experience keeps accumulating on the record.
    pub fn add_experience(&mut self, amount: u64) -> EngineResult<LevelUpReport> {
        let mut record = self.ensure_progress_record()?;
        let old_level = record.level;
        record.experience = record.experience.saturating_add(amount);

        while record.level < ProgressionCurve::MAX_LEVEL
            && record.experience >= self.progression.experience_requirement(record.level)
        {
            record.experience -= self.progression.experience_requirement(record.level);
            record.level += 1;
        }

        let levels_gained = record.level - old_level;
        if levels_gained > 0 {
            for level in (old_level + 1)..=record.level {
                if level % MILESTONE_INTERVAL == 0 {
                    self.unlock_milestone(&mut record, level)?;
                }
            }
            tracing::info!(
                player_id = %self.player_id,
                old_level,
                new_level = record.level,
                "player leveled up"
            );
        }

        self.save_progress(&record)?;
        self.stats.levels_gained += levels_gained as u64;
        self.stats.experience_awarded = self.stats.experience_awarded.saturating_add(amount);

        Ok(LevelUpReport {
            old_level,
            new_level: record.level,
            levels_gained,
            total_experience: record.experience,
        })
    }

    /// Records host-supplied behavioral readings for churn estimation.
    pub fn update_engagement(&mut self, signals: EngagementSignals) {
        self.engagement.record_signals(signals);
    }

    pub fn get_system_statistics(&self) -> SystemStatistics {
        self.stats
    }

    /// Long-tail special-drop chance given the encounters seen so far.
    pub fn rare_reward_probability(&self) -> f64 {
        self.rewards
            .calculate_rare_reward_probability(self.encounters_seen)
    }

    pub fn intervention_history(&self) -> impl Iterator<Item = &InterventionRecord> {
        self.interventions.iter()
    }

    pub fn config(&self) -> &GamificationConfig {
        &self.config
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Clears per-session state (windows, flow, engagement, counters) while
    /// leaving the persisted progress record alone.
    pub fn reset_session(&mut self) {
        self.tracker.reset();
        self.difficulty.reset();
        self.flow.reset();
        self.rewards.reset(&mut *self.rng);
        self.variety.reset();
        self.engagement.reset();
        self.session = SessionActivity::new();
        self.interventions.clear();
        self.encounters_seen = 0;
        tracing::debug!(player_id = %self.player_id, "session state reset");
    }

    /// Loads the record, creating and persisting a fresh one the first time
    /// this player id is seen.
    fn ensure_progress_record(&mut self) -> EngineResult<ProgressRecord> {
        let existing = self.stores.progress.get(&self.player_id).map_err(|e| {
            tracing::warn!(error = %e, player_id = %self.player_id, "failed to load progress record");
            e
        })?;
        if let Some(record) = existing {
            return Ok(record);
        }
        let record = ProgressRecord::new(self.player_id.clone());
        self.save_progress(&record)?;
        tracing::debug!(player_id = %self.player_id, "created fresh progress record");
        Ok(record)
    }

    fn save_progress(&mut self, record: &ProgressRecord) -> EngineResult<()> {
        self.stores.progress.save(record).map_err(|e| {
            tracing::warn!(error = %e, player_id = %self.player_id, "failed to save progress record");
            e
        })?;
        Ok(())
    }

    fn derive_engagement_factors(
        &self,
        record: &ProgressRecord,
        metrics: &PerformanceMetrics,
        now: i64,
    ) -> EngagementFactors {
        let session = &self.config.session;
        let session_duration =
            (self.session.session_minutes(now) / session.target_session_minutes.max(0.1)).min(1.0);
        let action_frequency = (self.session.actions_per_minute(now)
            / session.target_actions_per_minute.max(0.1))
        .min(1.0);
        let explored = ContentCategory::ALL
            .iter()
            .filter(|category| self.variety.exposure(**category) >= EXPLORED_THRESHOLD)
            .count();
        let exploration_rate = explored as f64 / ContentCategory::ALL.len() as f64;
        let achievement_progress = self.progression.level_progress(
            record.experience,
            self.progression.experience_requirement(record.level),
        );

        EngagementFactors {
            session_duration,
            action_frequency,
            success_rate: metrics.success_rate,
            exploration_rate,
            social_interaction: self.variety.exposure(ContentCategory::Social),
            achievement_progress,
        }
    }

    /// Escalates the suggested intervention using flow state, dispatches it,
    /// applies the outcome, and logs the record. A granted bonus is returned
    /// for the caller to persist once the progress record is saved.
    fn run_intervention(
        &mut self,
        suggested: InterventionType,
        churn_probability: f64,
        now: i64,
    ) -> (InterventionOutcome, Option<RewardEvent>) {
        let flow = self.flow.metrics();
        let kind = if flow.anxiety_score > 0.5 {
            InterventionType::DifficultyReduction
        } else if flow.boredom_score > 0.5 {
            InterventionType::ContentRecommendation
        } else {
            suggested
        };

        let recommended_category = if kind == InterventionType::ContentRecommendation {
            Some(self.variety.recommend_with_exploration(&mut *self.rng))
        } else {
            None
        };
        let context = InterventionContext {
            current_difficulty: self.difficulty.current_difficulty(),
            engagement_score: self.engagement.current_score(),
            churn_probability,
            recommended_category,
            milestone: None,
        };
        let outcome = self.dispatcher.trigger_intervention(kind, &context);

        if let Some(delta) = outcome.difficulty_delta {
            self.difficulty.apply_delta(delta, "intervention");
        }
        let bonus = match outcome.bonus_amount {
            Some(amount) => {
                let success_rate = self.tracker.success_rate();
                Some(self.rewards.grant_external(
                    "motivation_bonus",
                    amount,
                    "intervention",
                    success_rate,
                    &mut *self.rng,
                ))
            }
            None => None,
        };

        self.log_intervention(InterventionRecord {
            ts: now,
            intervention_type: kind,
            context,
            outcome: outcome.clone(),
        });
        self.stats.interventions_triggered += 1;
        tracing::info!(
            player_id = %self.player_id,
            kind = kind.as_str(),
            "intervention triggered"
        );
        (outcome, bonus)
    }

    fn unlock_milestone(&mut self, record: &mut ProgressRecord, level: u32) -> EngineResult<()> {
        let name = format!("level_{level}");
        self.stores
            .achievements
            .add(&self.player_id, &name)
            .map_err(|e| {
                tracing::warn!(error = %e, player_id = %self.player_id, "failed to persist achievement");
                e
            })?;
        if !record.unlocked_achievements.iter().any(|a| a == &name) {
            record.unlocked_achievements.push(name.clone());
        }

        let context = InterventionContext {
            current_difficulty: self.difficulty.current_difficulty(),
            engagement_score: self.engagement.current_score(),
            churn_probability: self.engagement.predict_churn_risk().churn_probability,
            recommended_category: None,
            milestone: Some(name),
        };
        let outcome = self
            .dispatcher
            .trigger_intervention(InterventionType::AchievementMilestone, &context);
        self.log_intervention(InterventionRecord {
            ts: Utc::now().timestamp_millis(),
            intervention_type: InterventionType::AchievementMilestone,
            context,
            outcome,
        });
        self.stats.interventions_triggered += 1;
        Ok(())
    }

    fn log_intervention(&mut self, record: InterventionRecord) {
        if self.interventions.len() >= INTERVENTION_LOG_CAP {
            self.interventions.pop_front();
        }
        self.interventions.push_back(record);
    }

    #[allow(clippy::too_many_arguments)]
    fn build_explanation(
        &self,
        event: &PlayerActionEvent,
        performance_score: f64,
        previous_difficulty: f64,
        new_difficulty: f64,
        reward_details: &Option<RewardDetails>,
        churn: &ChurnRiskAnalysis,
        intervention: Option<&InterventionOutcome>,
    ) -> DecisionNotes {
        let mut factors = Vec::new();
        let target = self.config.difficulty.target_performance;
        let impact = if performance_score > target {
            "above target"
        } else if performance_score < target {
            "below target"
        } else {
            "on target"
        };
        factors.push(DecisionFactor {
            name: "performance".to_string(),
            value: performance_score,
            impact: impact.to_string(),
        });

        let flow = self.flow.metrics();
        if flow.anxiety_score > 0.0 {
            factors.push(DecisionFactor {
                name: "anxiety".to_string(),
                value: flow.anxiety_score,
                impact: "challenge outpacing skill".to_string(),
            });
        }
        if flow.boredom_score > 0.0 {
            factors.push(DecisionFactor {
                name: "boredom".to_string(),
                value: flow.boredom_score,
                impact: "challenge below skill".to_string(),
            });
        }
        if self.session.frustration_level > 0.5 {
            factors.push(DecisionFactor {
                name: "frustration".to_string(),
                value: self.session.frustration_level,
                impact: "repeated failures".to_string(),
            });
        }
        if churn.churn_probability > 0.7 {
            factors.push(DecisionFactor {
                name: "churn_risk".to_string(),
                value: churn.churn_probability,
                impact: "player likely to disengage".to_string(),
            });
        }
        if let Some(reported) = event.difficulty {
            factors.push(DecisionFactor {
                name: "reported_difficulty".to_string(),
                value: reported,
                impact: "host context".to_string(),
            });
        }

        let mut changes = Vec::new();
        if (previous_difficulty - new_difficulty).abs() > f64::EPSILON {
            changes.push(format!(
                "difficulty: {previous_difficulty:.3} -> {new_difficulty:.3}"
            ));
        } else {
            changes.push(format!("difficulty: {new_difficulty:.3}"));
        }
        if let Some(details) = reward_details {
            changes.push(format!(
                "reward: {} ({:.0})",
                details.reward_type, details.amount
            ));
        }
        if let Some(outcome) = intervention {
            changes.push(format!("intervention: {}", outcome.intervention_type.as_str()));
        }

        let text = if factors.len() <= 1 {
            "performance steady, difficulty tracking target".to_string()
        } else {
            let names: Vec<&str> = factors[1..].iter().map(|f| f.name.as_str()).collect();
            format!("adjusted for {}", names.join(", "))
        };

        DecisionNotes {
            factors,
            changes,
            text,
        }
    }
}
