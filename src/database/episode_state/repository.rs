use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use super::model::{EpisodeStateRepository, StoredState};
use crate::database::RedisDatabase;

/// same key the old worker used so existing state carries over
pub const EPISODE_STATE_KEY: &str = "drama_state";

pub struct RedisEpisodeStateRepository {
    redis: Arc<RedisDatabase>,
}

impl RedisEpisodeStateRepository {
    pub fn new(redis: Arc<RedisDatabase>) -> Self {
        Self { redis }
    }
}

#[async_trait::async_trait]
impl EpisodeStateRepository for RedisEpisodeStateRepository {
    async fn load_state(&self) -> Result<Option<StoredState>> {
        let Some(raw) = self.redis.get_string(EPISODE_STATE_KEY).await? else {
            return Ok(None);
        };

        let state: StoredState =
            serde_json::from_str(&raw).context("stored episode state is not valid json")?;
        debug!("Loaded episode state for {} dramas", state.len());

        Ok(Some(state))
    }

    async fn save_state(&self, state: &StoredState) -> Result<()> {
        let raw = serde_json::to_string(state).context("failed to serialize episode state")?;
        self.redis.set_string(EPISODE_STATE_KEY, &raw).await?;
        debug!("Saved episode state for {} dramas", state.len());
        Ok(())
    }
}
