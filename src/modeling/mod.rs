pub mod engagement;
pub mod flow;
pub mod performance;
pub mod progression;

pub use engagement::EngagementAnalyzer;
pub use flow::FlowStateOptimizer;
pub use performance::PerformanceTracker;
pub use progression::ProgressionCurve;
