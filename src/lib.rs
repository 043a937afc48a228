//! # gamification-core
//!
//! Adaptive player-modeling engine. Tracks a rolling performance window per
//! player and feeds it through difficulty control, flow-state tracking,
//! variable-ratio rewards, content-variety steering, engagement and churn
//! analysis, and level progression, all behind a single facade.
//!
//! ## Module structure
//!
//! - [`engine`] - [`GamificationEngine`] facade sequencing every component
//! - [`modeling`] - performance window, flow state, engagement, progression
//! - [`decision`] - difficulty control loop, reward gate, variety, interventions
//! - [`store`] - persistence traits plus in-memory implementations
//! - [`config`] - tunable parameters with environment overrides
//! - [`types`] - shared data model (events, snapshots, analytics)
//! - [`error`] - error taxonomy
//!
//! ## Usage
//!
//! ```rust
//! use gamification_core::{
//!     EngineStores, GamificationConfig, GamificationEngine, PlayerActionEvent,
//! };
//!
//! # fn main() -> Result<(), gamification_core::EngineError> {
//! let mut engine = GamificationEngine::new(
//!     "player-1",
//!     GamificationConfig::default(),
//!     EngineStores::in_memory(),
//! );
//! engine.initialize()?;
//!
//! let event = PlayerActionEvent {
//!     action_type: "quest_complete".to_string(),
//!     success: true,
//!     time_taken: 24.0,
//!     difficulty: None,
//!     resources_used: 12.0,
//!     damage_taken: Some(0.1),
//!     content_category: Some("combat".to_string()),
//!     timestamp: None,
//!     metadata: Default::default(),
//! };
//! let result = engine.process_player_action(&event)?;
//! assert!(result.new_difficulty > 0.0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod modeling;
pub mod store;
pub mod types;

pub use config::GamificationConfig;
pub use engine::GamificationEngine;
pub use error::{EngineError, EngineResult, StoreError};
pub use store::{AchievementStore, EngineStores, ProgressStore, RewardStore};
pub use types::*;
