use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;

use tracing::{info, warn};

use edge::{AppConfig, EdgeApplicationServer, Logger, RedisDatabase};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Arc::new(AppConfig::parse());

    // init logger and sentry, guards are kept alive to flush logs and maintain sentry connection
    let _guards = Logger::init(config.cargo_env, config.sentry_dsn.clone());

    info!("logger and env prepped...");

    // redis only backs the notifier state so the relay can run without it
    let redis_db = match &config.redis_url {
        Some(redis_url) => {
            info!("connecting to redis...");
            let redis_db = RedisDatabase::connect(redis_url)
                .await
                .context("where is the redis connection!!")?;
            info!("redis connection ok");
            Some(redis_db)
        }
        None => {
            warn!("REDIS_URL not set, notifier state will not be persisted");
            None
        }
    };

    info!("starting edge server...");

    EdgeApplicationServer::serve(config, redis_db)
        .await
        .context("edge server failed to start")?;

    Ok(())
}
