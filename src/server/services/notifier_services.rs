use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::catalog_services::DynCatalogService;
use super::telegram_services::{
    DynTelegramService, ParseMode, TelegramPhoto, format_new_episode_photo,
};
use crate::database::{DramaState, DynEpisodeStateRepository, StoredState};
use crate::server::{
    dtos::{
        catalog_dto::Drama,
        cron_dto::{
            CronFailure, EmptyStateReport, NotificationSummary, NotifyReport, NotifyResponse,
            StateResponse, StoredStateReport,
        },
    },
    error::AppResult,
};

/// gap between two telegram posts so the channel doesn't get rate limited
const SEND_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    /// public site, watch links are `{site}/drama/{id}?play={episode}`
    pub site_base_url: String,
    pub send_delay: Duration,
}

impl NotifierSettings {
    pub fn new(
        bot_token: Option<String>,
        channel_id: Option<String>,
        site_base_url: String,
    ) -> Self {
        Self {
            bot_token: bot_token.filter(|t| !t.is_empty()),
            channel_id: channel_id.filter(|c| !c.is_empty()),
            site_base_url,
            send_delay: SEND_DELAY,
        }
    }
}

/// Posts a Telegram photo for every episode that appeared since the last run.
///
/// Episode counts live in the state repository. A drama seen for the first time only gets its
/// count recorded, otherwise the first run after a wipe would announce whole back catalogs.
pub struct NotifierService {
    catalog: DynCatalogService,
    telegram: DynTelegramService,
    state: Option<DynEpisodeStateRepository>,
    settings: NotifierSettings,
}

impl NotifierService {
    pub fn new(
        catalog: DynCatalogService,
        telegram: DynTelegramService,
        state: Option<DynEpisodeStateRepository>,
        settings: NotifierSettings,
    ) -> Self {
        Self {
            catalog,
            telegram,
            state,
            settings,
        }
    }

    pub async fn run(&self) -> AppResult<NotifyResponse> {
        let (Some(bot_token), Some(channel_id)) = (
            self.settings.bot_token.as_deref(),
            self.settings.channel_id.as_deref(),
        ) else {
            error!("Missing Telegram configuration");
            return Ok(NotifyResponse::Failure(CronFailure::new(
                "Missing Telegram configuration",
            )));
        };

        let mut stored = self.load_state().await;
        let ongoing = self.catalog.ongoing_dramas().await?;
        let mut notifications = Vec::new();

        for drama in &ongoing {
            match self
                .check_drama(drama, bot_token, channel_id, &mut stored)
                .await
            {
                Ok(Some(new_episodes)) => notifications.push(NotificationSummary {
                    title: drama.title.clone(),
                    new_episodes,
                }),
                Ok(None) => {}
                Err(e) => error!("Failed to process drama {}: {}", drama.id, e),
            }
        }

        if let Some(repository) = &self.state {
            if let Err(e) = repository.save_state(&stored).await {
                error!("Failed to write episode state: {:#}", e);
            }
        }

        info!(
            "Notifier run done: {} ongoing dramas, {} with new episodes",
            ongoing.len(),
            notifications.len()
        );

        Ok(NotifyResponse::Report(NotifyReport {
            success: true,
            timestamp: Utc::now(),
            ongoing_dramas_count: ongoing.len(),
            notifications_sent: notifications.len(),
            notifications,
        }))
    }

    pub async fn stored_state(&self) -> StateResponse {
        let Some(repository) = &self.state else {
            return StateResponse::Failure(CronFailure::new("KV namespace not available"));
        };

        match repository.load_state().await {
            Ok(Some(state)) => StateResponse::Stored(StoredStateReport {
                success: true,
                total_dramas: state.len(),
                state,
            }),
            Ok(None) => StateResponse::Empty(EmptyStateReport {
                success: true,
                state: StoredState::new(),
                message: "No state stored yet".to_string(),
            }),
            Err(e) => {
                error!("Failed to get state: {:#}", e);
                StateResponse::Failure(CronFailure::new("Failed to retrieve state"))
            }
        }
    }

    /// runs the notifier every `every`, the first run happens one interval after startup
    pub fn spawn_schedule(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        info!("Scheduling notifier every {:?}", every);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the first tick fires immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                debug!("Scheduled notifier run starting");
                if let Err(e) = self.run().await {
                    error!("Scheduled notifier run failed: {}", e);
                }
            }
        })
    }

    async fn load_state(&self) -> StoredState {
        let Some(repository) = &self.state else {
            return StoredState::new();
        };

        match repository.load_state().await {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                error!("Failed to read episode state: {:#}", e);
                StoredState::new()
            }
        }
    }

    /// `Some(n)` when n new episodes were announced
    async fn check_drama(
        &self,
        drama: &Drama,
        bot_token: &str,
        channel_id: &str,
        stored: &mut StoredState,
    ) -> AppResult<Option<u32>> {
        let episodes = self.catalog.drama_episodes(&drama.id).await?;
        let current_count = episodes.len() as u32;

        let new_episodes = match stored.get(&drama.id) {
            Some(previous) if current_count > previous.last_episode_count => {
                Some(current_count - previous.last_episode_count)
            }
            _ => None,
        };

        if let Some(new_episodes) = new_episodes {
            // newest first
            for episode in episodes.iter().rev().take(new_episodes as usize) {
                let watch_url = format!(
                    "{}/drama/{}?play={}",
                    self.settings.site_base_url, drama.id, episode.id
                );

                let photo = TelegramPhoto {
                    chat_id: channel_id.to_string(),
                    photo: drama.poster.clone(),
                    caption: Some(format_new_episode_photo(
                        &drama.title,
                        episode.episode_number,
                        &watch_url,
                    )),
                    parse_mode: Some(ParseMode::MarkdownV2),
                };

                if !self.telegram.send_photo(bot_token, &photo).await {
                    warn!(
                        "Notification for {} episode {} was not delivered",
                        drama.title, episode.episode_number
                    );
                }

                tokio::time::sleep(self.settings.send_delay).await;
            }
        }

        stored.insert(
            drama.id.clone(),
            DramaState {
                last_episode_count: current_count,
                last_checked: Utc::now(),
            },
        );

        Ok(new_episodes)
    }
}
