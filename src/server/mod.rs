pub mod api;
pub mod dtos;
pub mod error;
pub mod extractors;
pub mod services;
pub mod utils;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{Extension, Router, http::HeaderValue, http::Method, http::header, routing::get};
use once_cell::sync::Lazy;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{config::AppConfig, database::RedisDatabase};
use api::{CronController, ProxyController, health_endpoint};
use services::edge_services::EdgeServices;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

pub fn get_uptime_seconds() -> u64 {
    START_TIME.elapsed().as_secs()
}

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub struct EdgeApplicationServer;

impl EdgeApplicationServer {
    pub async fn serve(config: Arc<AppConfig>, redis_db: Option<RedisDatabase>) -> anyhow::Result<()> {
        Lazy::force(&START_TIME);

        let services = EdgeServices::new(redis_db, config.clone())?;

        if let Some(minutes) = config.notify_interval_minutes.filter(|m| *m > 0) {
            services
                .notifier
                .clone()
                .spawn_schedule(Duration::from_secs(minutes * 60));
        }

        let router = Self::router(services);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        info!("edge server listening on {}", addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(Self::shutdown_signal())
        .await
        .context("error while serving")?;

        info!("edge server stopped");
        Ok(())
    }

    /// full route table, also what the integration tests drive
    pub fn router(services: EdgeServices) -> Router {
        // the relay sets its own cors headers, this layer is only for the json routes
        let cors = Self::cors_layer(&services.config.cors_origin);

        let api = Router::new()
            .route("/health", get(health_endpoint))
            .nest("/api/cron", CronController::app())
            .layer(cors);

        Router::new()
            .merge(api)
            .merge(ProxyController::app())
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(Extension(services)),
            )
    }

    fn cors_layer(cors_origin: &str) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

        if cors_origin.trim() == "*" {
            return layer.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = cors_origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("ignoring invalid cors origin {}", origin);
                    None
                }
            })
            .collect();

        layer.allow_origin(AllowOrigin::list(origins))
    }

    async fn shutdown_signal() {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for shutdown signal: {}", e);
            // never resolve, keep serving
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
    }
}
