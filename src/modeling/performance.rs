use std::collections::VecDeque;

use crate::config::PerformanceParams;
use crate::types::PerformanceMetrics;

/// One finished encounter as fed to the tracker.
#[derive(Debug, Clone, Copy)]
pub struct EncounterOutcome {
    pub success: bool,
    pub time_taken: f64,
    pub resources_used: f64,
}

/// Sliding-window view over recent encounter outcomes.
///
/// Efficiency factors normalize mean spend against a configured ceiling, so
/// faster and cheaper encounters score closer to 1.0. With an empty window
/// every metric reads zero.
#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    params: PerformanceParams,
    window: VecDeque<EncounterOutcome>,
}

impl PerformanceTracker {
    pub fn new(params: PerformanceParams) -> Self {
        Self {
            window: VecDeque::with_capacity(params.window_size),
            params,
        }
    }

    /// Records one outcome, evicting the oldest entry once the window is full.
    pub fn record(&mut self, outcome: EncounterOutcome) {
        if self.window.len() >= self.params.window_size {
            self.window.pop_front();
        }
        self.window.push_back(outcome);
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    pub fn success_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let successes = self.window.iter().filter(|o| o.success).count();
        successes as f64 / self.window.len() as f64
    }

    /// Fraction of recent encounters that failed; zero for an empty window.
    pub fn failure_fraction(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        1.0 - self.success_rate()
    }

    /// Success flags of the most recent `n` encounters, oldest first.
    pub fn recent_outcomes(&self, n: usize) -> Vec<bool> {
        let skip = self.window.len().saturating_sub(n);
        self.window.iter().skip(skip).map(|o| o.success).collect()
    }

    fn time_efficiency(&self) -> f64 {
        let mean = self.window.iter().map(|o| o.time_taken).sum::<f64>()
            / self.window.len() as f64;
        let ceiling = self.params.max_encounter_seconds.max(f64::EPSILON);
        1.0 - (mean / ceiling).min(1.0)
    }

    fn resource_efficiency(&self) -> f64 {
        let mean = self.window.iter().map(|o| o.resources_used).sum::<f64>()
            / self.window.len() as f64;
        let ceiling = self.params.max_encounter_resources.max(f64::EPSILON);
        1.0 - (mean / ceiling).min(1.0)
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        if self.window.is_empty() {
            return PerformanceMetrics::default();
        }
        let success_rate = self.success_rate();
        let time_efficiency = self.time_efficiency();
        let resource_efficiency = self.resource_efficiency();
        let overall_score = self.params.success_weight * success_rate
            + self.params.time_weight * time_efficiency
            + self.params.resource_weight * resource_efficiency;
        PerformanceMetrics {
            success_rate,
            time_efficiency,
            resource_efficiency,
            overall_score,
            sample_count: self.window.len(),
        }
    }

    pub fn overall_score(&self) -> f64 {
        self.metrics().overall_score
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}
