use std::collections::{BTreeMap, VecDeque};

use crate::config::EngagementParams;
use crate::types::{
    ChurnRiskAnalysis, EngagementLevel, EngagementSignals, EngagementSnapshot, InterventionType,
    RiskLevel,
};

/// Factor readings in [0, 1] feeding one engagement update.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementFactors {
    pub session_duration: f64,
    pub action_frequency: f64,
    pub success_rate: f64,
    pub exploration_rate: f64,
    pub social_interaction: f64,
    pub achievement_progress: f64,
}

const DEFAULT_CONFIDENCE: f64 = 0.85;
const DEGRADED_CONFIDENCE: f64 = 0.5;
const MIN_SLOPE_SAMPLES: usize = 3;

/// Weighted multi-factor engagement score plus a churn-risk estimate.
///
/// Churn averages whatever behavioral markers are available; with no recorded
/// signals the estimate still exists but carries degraded confidence.
#[derive(Debug, Clone)]
pub struct EngagementAnalyzer {
    params: EngagementParams,
    current_score: f64,
    last_factors: EngagementFactors,
    history: VecDeque<f64>,
    signals: VecDeque<EngagementSignals>,
}

impl EngagementAnalyzer {
    pub fn new(params: EngagementParams) -> Self {
        Self {
            params,
            current_score: 0.0,
            last_factors: EngagementFactors::default(),
            history: VecDeque::new(),
            signals: VecDeque::new(),
        }
    }

    /// Recomputes the aggregate score and appends it to the history.
    pub fn calculate_score(&mut self, factors: &EngagementFactors) -> f64 {
        let clamped = EngagementFactors {
            session_duration: factors.session_duration.clamp(0.0, 1.0),
            action_frequency: factors.action_frequency.clamp(0.0, 1.0),
            success_rate: factors.success_rate.clamp(0.0, 1.0),
            exploration_rate: factors.exploration_rate.clamp(0.0, 1.0),
            social_interaction: factors.social_interaction.clamp(0.0, 1.0),
            achievement_progress: factors.achievement_progress.clamp(0.0, 1.0),
        };
        let w = &self.params.weights;
        let score = (w.session_duration * clamped.session_duration
            + w.action_frequency * clamped.action_frequency
            + w.success_rate * clamped.success_rate
            + w.exploration_rate * clamped.exploration_rate
            + w.social_interaction * clamped.social_interaction
            + w.achievement_progress * clamped.achievement_progress)
            .clamp(0.0, 1.0);

        if self.history.len() >= self.params.history_cap {
            self.history.pop_front();
        }
        self.history.push_back(score);
        self.last_factors = clamped;
        self.current_score = score;
        score
    }

    /// Stores host-supplied behavioral readings for churn estimation.
    pub fn record_signals(&mut self, signals: EngagementSignals) {
        if self.signals.len() >= self.params.signal_history_cap {
            self.signals.pop_front();
        }
        self.signals.push_back(signals);
    }

    pub fn current_score(&self) -> f64 {
        self.current_score
    }

    /// Factor readings from the latest update keyed by camelCase label, plus
    /// the aggregate under `overall`.
    pub fn score_breakdown(&self) -> BTreeMap<String, f64> {
        let f = &self.last_factors;
        let mut breakdown = BTreeMap::new();
        breakdown.insert("sessionDuration".to_string(), f.session_duration);
        breakdown.insert("actionFrequency".to_string(), f.action_frequency);
        breakdown.insert("successRate".to_string(), f.success_rate);
        breakdown.insert("explorationRate".to_string(), f.exploration_rate);
        breakdown.insert("socialInteraction".to_string(), f.social_interaction);
        breakdown.insert("achievementProgress".to_string(), f.achievement_progress);
        breakdown.insert("overall".to_string(), self.current_score);
        breakdown
    }

    pub fn engagement_level(&self) -> EngagementLevel {
        if self.current_score < self.params.low_threshold {
            EngagementLevel::Low
        } else if self.current_score > self.params.high_threshold {
            EngagementLevel::High
        } else {
            EngagementLevel::Medium
        }
    }

    pub fn predict_churn_risk(&self) -> ChurnRiskAnalysis {
        let mut markers = vec![1.0 - self.current_score];
        if let Some(latest) = self.signals.back() {
            if let Some(error_rate) = latest.error_rate {
                markers.push(error_rate.clamp(0.0, 1.0));
            }
            if let Some(frustration) = latest.frustration {
                markers.push(frustration.clamp(0.0, 1.0));
            }
            if let Some(accuracy) = latest.decision_accuracy {
                markers.push(1.0 - accuracy.clamp(0.0, 1.0));
            }
            if let Some(enjoyment) = latest.enjoyment {
                markers.push(1.0 - enjoyment.clamp(0.0, 1.0));
            }
            if let Some(motivation) = latest.motivation {
                markers.push(1.0 - motivation.clamp(0.0, 1.0));
            }
        }
        let slope = self.history_slope();
        if slope < 0.0 {
            markers.push((-slope * 10.0).min(1.0));
        }

        let churn_probability =
            (markers.iter().sum::<f64>() / markers.len() as f64).clamp(0.0, 1.0);
        let risk_level = if churn_probability < self.params.low_threshold {
            RiskLevel::Low
        } else if churn_probability > self.params.high_threshold {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };
        let model_confidence = if self.signals.is_empty() {
            DEGRADED_CONFIDENCE
        } else {
            DEFAULT_CONFIDENCE
        };

        ChurnRiskAnalysis {
            churn_probability,
            risk_level,
            model_confidence,
        }
    }

    /// Suggests a remediation when the score drops below the low band.
    pub fn should_trigger_intervention(&self) -> Option<InterventionType> {
        if self.current_score < self.params.low_threshold {
            Some(InterventionType::RewardBonus)
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> EngagementSnapshot {
        EngagementSnapshot {
            current_score: self.current_score,
            engagement_level: self.engagement_level(),
            history: self.history.iter().copied().collect(),
        }
    }

    pub fn reset(&mut self) {
        self.current_score = 0.0;
        self.last_factors = EngagementFactors::default();
        self.history.clear();
        self.signals.clear();
    }

    /// Least-squares slope of the score history over sample index.
    fn history_slope(&self) -> f64 {
        let n = self.history.len();
        if n < MIN_SLOPE_SAMPLES {
            return 0.0;
        }
        let n_f = n as f64;
        let mean_x = (n_f - 1.0) / 2.0;
        let mean_y = self.history.iter().sum::<f64>() / n_f;
        let mut num = 0.0;
        let mut den = 0.0;
        for (i, y) in self.history.iter().enumerate() {
            let dx = i as f64 - mean_x;
            num += dx * (y - mean_y);
            den += dx * dx;
        }
        if den == 0.0 {
            0.0
        } else {
            num / den
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> EngagementAnalyzer {
        EngagementAnalyzer::new(EngagementParams::default())
    }

    fn uniform_factors(value: f64) -> EngagementFactors {
        EngagementFactors {
            session_duration: value,
            action_frequency: value,
            success_rate: value,
            exploration_rate: value,
            social_interaction: value,
            achievement_progress: value,
        }
    }

    #[test]
    fn test_score_spans_unit_interval() {
        let mut analyzer = analyzer();
        assert_eq!(analyzer.calculate_score(&uniform_factors(0.0)), 0.0);
        assert!((analyzer.calculate_score(&uniform_factors(1.0)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_weighted_blend() {
        let mut analyzer = analyzer();
        let factors = EngagementFactors {
            session_duration: 1.0,
            action_frequency: 1.0,
            ..EngagementFactors::default()
        };
        // 0.25 + 0.20
        assert!((analyzer.calculate_score(&factors) - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_level_banding() {
        let mut analyzer = analyzer();
        analyzer.calculate_score(&uniform_factors(0.25));
        assert_eq!(analyzer.engagement_level(), EngagementLevel::Low);
        analyzer.calculate_score(&uniform_factors(0.5));
        assert_eq!(analyzer.engagement_level(), EngagementLevel::Medium);
        analyzer.calculate_score(&uniform_factors(0.75));
        assert_eq!(analyzer.engagement_level(), EngagementLevel::High);
        // Values just inside the band edges stay medium.
        analyzer.calculate_score(&uniform_factors(0.31));
        assert_eq!(analyzer.engagement_level(), EngagementLevel::Medium);
        analyzer.calculate_score(&uniform_factors(0.69));
        assert_eq!(analyzer.engagement_level(), EngagementLevel::Medium);
    }

    #[test]
    fn test_breakdown_reports_clamped_factors() {
        let mut analyzer = analyzer();
        analyzer.calculate_score(&EngagementFactors {
            session_duration: 1.4,
            action_frequency: -0.2,
            success_rate: 0.5,
            ..EngagementFactors::default()
        });
        let breakdown = analyzer.score_breakdown();
        assert_eq!(breakdown.len(), 7);
        assert_eq!(breakdown["sessionDuration"], 1.0);
        assert_eq!(breakdown["actionFrequency"], 0.0);
        assert_eq!(breakdown["successRate"], 0.5);
        assert!((breakdown["overall"] - analyzer.current_score()).abs() < 1e-12);
    }

    #[test]
    fn test_low_score_triggers_reward_bonus() {
        let mut analyzer = analyzer();
        analyzer.calculate_score(&uniform_factors(0.25));
        assert_eq!(
            analyzer.should_trigger_intervention(),
            Some(InterventionType::RewardBonus)
        );
        analyzer.calculate_score(&uniform_factors(0.5));
        assert_eq!(analyzer.should_trigger_intervention(), None);
    }

    #[test]
    fn test_churn_confidence_degrades_without_signals() {
        let mut analyzer = analyzer();
        analyzer.calculate_score(&uniform_factors(0.5));
        assert_eq!(analyzer.predict_churn_risk().model_confidence, 0.5);

        analyzer.record_signals(EngagementSignals {
            frustration: Some(0.2),
            ..EngagementSignals::default()
        });
        assert_eq!(analyzer.predict_churn_risk().model_confidence, 0.85);
    }

    #[test]
    fn test_negative_signals_raise_churn_probability() {
        let mut content = analyzer();
        content.calculate_score(&uniform_factors(0.8));
        content.record_signals(EngagementSignals {
            frustration: Some(0.1),
            enjoyment: Some(0.9),
            motivation: Some(0.9),
            ..EngagementSignals::default()
        });

        let mut frustrated = analyzer();
        frustrated.calculate_score(&uniform_factors(0.2));
        frustrated.record_signals(EngagementSignals {
            frustration: Some(0.9),
            error_rate: Some(0.8),
            motivation: Some(0.1),
            ..EngagementSignals::default()
        });

        let low = content.predict_churn_risk();
        let high = frustrated.predict_churn_risk();
        assert!(high.churn_probability > low.churn_probability);
        assert_eq!(high.risk_level, RiskLevel::High);
        assert_eq!(low.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_declining_history_adds_churn_marker() {
        let mut steady = analyzer();
        let mut declining = analyzer();
        for i in 0..10 {
            steady.calculate_score(&uniform_factors(0.6));
            declining.calculate_score(&uniform_factors(0.9 - 0.06 * i as f64));
        }
        // Both end at comparable scores; only the declining one carries the
        // downward-trend marker.
        let steady_risk = steady.predict_churn_risk();
        let declining_risk = declining.predict_churn_risk();
        assert!(declining_risk.churn_probability > steady_risk.churn_probability);
    }

    #[test]
    fn test_history_caps() {
        let params = EngagementParams {
            history_cap: 5,
            signal_history_cap: 3,
            ..EngagementParams::default()
        };
        let mut analyzer = EngagementAnalyzer::new(params);
        for _ in 0..20 {
            analyzer.calculate_score(&uniform_factors(0.5));
            analyzer.record_signals(EngagementSignals::default());
        }
        assert_eq!(analyzer.snapshot().history.len(), 5);
        assert_eq!(analyzer.signals.len(), 3);
    }
}
