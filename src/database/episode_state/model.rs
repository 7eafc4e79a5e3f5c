use anyhow::Result;
use chrono::{DateTime, Utc};
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// last thing the notifier saw for a single drama
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DramaState {
    pub last_episode_count: u32,
    pub last_checked: DateTime<Utc>,
}

/// keyed by drama id, stored as one json blob
pub type StoredState = BTreeMap<String, DramaState>;

pub type DynEpisodeStateRepository = Arc<dyn EpisodeStateRepository + Send + Sync>;

#[automock]
#[async_trait::async_trait]
pub trait EpisodeStateRepository {
    /// `None` when nothing has been stored yet
    async fn load_state(&self) -> Result<Option<StoredState>>;
    async fn save_state(&self, state: &StoredState) -> Result<()>;
}
