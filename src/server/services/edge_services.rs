use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::{
    config::AppConfig,
    database::{DynEpisodeStateRepository, RedisDatabase, RedisEpisodeStateRepository},
    server::utils::url_policy_utils::UrlPolicy,
};

use super::{
    DynCatalogService, DynTelegramService, DynVideoRelayService,
    catalog_services::CatalogService,
    notifier_services::{NotifierService, NotifierSettings},
    telegram_services::TelegramService,
    video_relay_services::VideoRelayService,
};

/// everything the handlers need, cloned into every request through an Extension
#[derive(Clone)]
pub struct EdgeServices {
    pub relay: DynVideoRelayService,
    pub notifier: Arc<NotifierService>,
    pub redis: Option<Arc<RedisDatabase>>,
    pub config: Arc<AppConfig>,
}

impl EdgeServices {
    pub fn new(redis_db: Option<RedisDatabase>, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        info!("starting edge services...");

        // the relay gets its own client, see VideoRelayService::client_builder
        let relay = Arc::new(
            VideoRelayService::new(UrlPolicy::default())
                .context("failed to build the relay http client")?,
        ) as DynVideoRelayService;

        info!("video relay ok, starting notifier...");

        // the json apis share this one, they answer quickly or not at all
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build the api http client")?;

        let redis = redis_db.map(Arc::new);

        let catalog = Arc::new(CatalogService::new(
            http.clone(),
            config.catalog_api_base.clone(),
            config.catalog_api_key.clone(),
        )) as DynCatalogService;

        let telegram = Arc::new(TelegramService::new(
            http,
            config.telegram_api_base.clone(),
        )) as DynTelegramService;

        let state = redis.clone().map(|redis| {
            Arc::new(RedisEpisodeStateRepository::new(redis)) as DynEpisodeStateRepository
        });

        let notifier = Arc::new(NotifierService::new(
            catalog,
            telegram,
            state,
            NotifierSettings::new(
                config.telegram_bot_token.clone(),
                config.telegram_channel_id.clone(),
                config.site_base_url(),
            ),
        ));

        Ok(Self {
            relay,
            notifier,
            redis,
            config,
        })
    }

    /// swap the relay, tests use this to point it at a local upstream
    pub fn with_relay(mut self, relay: DynVideoRelayService) -> Self {
        self.relay = relay;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<NotifierService>) -> Self {
        self.notifier = notifier;
        self
    }
}
