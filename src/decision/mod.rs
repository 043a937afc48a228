pub mod difficulty;
pub mod intervention;
pub mod reward;
pub mod variety;

pub use difficulty::DifficultyAdjustmentEngine;
pub use intervention::InterventionDispatcher;
pub use reward::RewardScheduler;
pub use variety::ContentVarietyOptimizer;
