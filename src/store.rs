use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::types::{ProgressRecord, RewardEvent};

/// Durable home for [`ProgressRecord`]s. Implementations report failures as
/// [`StoreError`]; the engine surfaces them instead of swallowing.
pub trait ProgressStore {
    fn get(&self, player_id: &str) -> Result<Option<ProgressRecord>, StoreError>;
    fn save(&self, record: &ProgressRecord) -> Result<(), StoreError>;
}

pub trait AchievementStore {
    fn add(&self, player_id: &str, achievement: &str) -> Result<(), StoreError>;
    fn list(&self, player_id: &str) -> Result<Vec<String>, StoreError>;
}

pub trait RewardStore {
    fn add(&self, player_id: &str, event: &RewardEvent) -> Result<(), StoreError>;
    fn list(&self, player_id: &str) -> Result<Vec<RewardEvent>, StoreError>;
}

/// Bundle of collaborator stores handed to the engine at construction.
pub struct EngineStores {
    pub progress: Box<dyn ProgressStore + Send>,
    pub achievements: Box<dyn AchievementStore + Send>,
    pub rewards: Box<dyn RewardStore + Send>,
}

impl EngineStores {
    /// All-in-memory bundle, suitable for tests and single-process hosts.
    pub fn in_memory() -> Self {
        Self {
            progress: Box::new(InMemoryProgressStore::default()),
            achievements: Box::new(InMemoryAchievementStore::default()),
            rewards: Box::new(InMemoryRewardStore::default()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    records: Mutex<HashMap<String, ProgressRecord>>,
}

impl ProgressStore for InMemoryProgressStore {
    fn get(&self, player_id: &str) -> Result<Option<ProgressRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::unavailable("progress store lock poisoned"))?;
        Ok(records.get(player_id).cloned())
    }

    fn save(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::unavailable("progress store lock poisoned"))?;
        records.insert(record.player_id.clone(), record.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAchievementStore {
    unlocked: Mutex<HashMap<String, Vec<String>>>,
}

impl AchievementStore for InMemoryAchievementStore {
    fn add(&self, player_id: &str, achievement: &str) -> Result<(), StoreError> {
        let mut unlocked = self
            .unlocked
            .lock()
            .map_err(|_| StoreError::unavailable("achievement store lock poisoned"))?;
        let entries = unlocked.entry(player_id.to_string()).or_default();
        if !entries.iter().any(|a| a == achievement) {
            entries.push(achievement.to_string());
        }
        Ok(())
    }

    fn list(&self, player_id: &str) -> Result<Vec<String>, StoreError> {
        let unlocked = self
            .unlocked
            .lock()
            .map_err(|_| StoreError::unavailable("achievement store lock poisoned"))?;
        Ok(unlocked.get(player_id).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRewardStore {
    granted: Mutex<HashMap<String, Vec<RewardEvent>>>,
}

impl RewardStore for InMemoryRewardStore {
    fn add(&self, player_id: &str, event: &RewardEvent) -> Result<(), StoreError> {
        let mut granted = self
            .granted
            .lock()
            .map_err(|_| StoreError::unavailable("reward store lock poisoned"))?;
        granted
            .entry(player_id.to_string())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    fn list(&self, player_id: &str) -> Result<Vec<RewardEvent>, StoreError> {
        let granted = self
            .granted
            .lock()
            .map_err(|_| StoreError::unavailable("reward store lock poisoned"))?;
        Ok(granted.get(player_id).cloned().unwrap_or_default())
    }
}
