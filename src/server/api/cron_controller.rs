use axum::{Json, Router, routing::get};
use tracing::info;

use crate::server::{
    dtos::cron_dto::{NotifyResponse, StateResponse},
    error::AppResult,
    extractors::CronAuthentication,
};

pub struct CronController;

impl CronController {
    pub fn app() -> Router {
        Router::new()
            .route("/notify", get(Self::notify).post(Self::notify))
            .route("/state", get(Self::state))
    }

    /// one notifier pass, same thing the scheduled task does
    async fn notify(
        CronAuthentication(services): CronAuthentication,
    ) -> AppResult<Json<NotifyResponse>> {
        info!("notifier run triggered over http");
        services.notifier.run().await.map(Json)
    }

    async fn state(CronAuthentication(services): CronAuthentication) -> Json<StateResponse> {
        Json(services.notifier.stored_state().await)
    }
}
