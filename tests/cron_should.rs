use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use edge::AppConfig;
use edge::EdgeApplicationServer;
use edge::server::error::Error;
use edge::server::services::catalog_services::MockCatalogServiceTrait;
use edge::server::services::edge_services::EdgeServices;
use edge::server::services::notifier_services::{NotifierService, NotifierSettings};
use edge::server::services::telegram_services::MockTelegramServiceTrait;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn app(config: AppConfig, catalog: MockCatalogServiceTrait, bot_token: Option<&str>) -> Router {
    let notifier = NotifierService::new(
        Arc::new(catalog),
        Arc::new(MockTelegramServiceTrait::new()),
        None,
        NotifierSettings {
            send_delay: Duration::ZERO,
            ..NotifierSettings::new(
                bot_token.map(str::to_string),
                Some("@dramaqueen".to_string()),
                "https://dramaqueen.test".to_string(),
            )
        },
    );

    let services = EdgeServices::new(None, Arc::new(config))
        .unwrap()
        .with_notifier(Arc::new(notifier));

    EdgeApplicationServer::router(services)
}

fn quiet_catalog() -> MockCatalogServiceTrait {
    let mut catalog = MockCatalogServiceTrait::new();
    catalog.expect_ongoing_dramas().returning(|| Ok(Vec::new()));
    catalog
}

fn guarded() -> AppConfig {
    AppConfig {
        cron_secret: Some("hunter2".to_string()),
        ..Default::default()
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn notify_without_bearer_is_unauthorized() {
    // nothing may run when the caller is rejected
    let app = app(guarded(), MockCatalogServiceTrait::new(), Some("bot-token"));

    let response = app
        .oneshot(Request::get("/api/cron/notify").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Unauthorized");
}

#[tokio::test]
async fn notify_with_wrong_bearer_is_unauthorized() {
    let app = app(guarded(), MockCatalogServiceTrait::new(), Some("bot-token"));

    let response = app
        .oneshot(
            Request::post("/api/cron/notify")
                .header(header::AUTHORIZATION, "Bearer hunter3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn notify_with_bearer_runs_once_per_call() {
    let mut catalog = MockCatalogServiceTrait::new();
    catalog
        .expect_ongoing_dramas()
        .times(2)
        .returning(|| Ok(Vec::new()));
    let app = app(guarded(), catalog, Some("bot-token"));

    for request in [
        Request::get("/api/cron/notify"),
        Request::post("/api/cron/notify"),
    ] {
        let response = app
            .clone()
            .oneshot(
                request
                    .header(header::AUTHORIZATION, "Bearer hunter2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["ongoingDramasCount"], 0);
        assert_eq!(json["notificationsSent"], 0);
        assert!(json["notifications"].as_array().unwrap().is_empty());
        assert!(json["timestamp"].is_string());
    }
}

#[tokio::test]
async fn routes_are_open_without_a_secret() {
    let app = app(AppConfig::default(), quiet_catalog(), Some("bot-token"));

    let response = app
        .oneshot(Request::get("/api/cron/notify").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_telegram_configuration_is_a_soft_failure() {
    let app = app(AppConfig::default(), MockCatalogServiceTrait::new(), None);

    let response = app
        .oneshot(Request::get("/api/cron/notify").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Missing Telegram configuration");
}

#[tokio::test]
async fn catalog_outage_is_a_server_error() {
    let mut catalog = MockCatalogServiceTrait::new();
    catalog.expect_ongoing_dramas().returning(|| {
        Err(Error::InternalServerErrorWithContext(
            "API Error: 503".to_string(),
        ))
    });
    let app = app(AppConfig::default(), catalog, Some("bot-token"));

    let response = app
        .oneshot(Request::get("/api/cron/notify").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // the catalog detail stays in the logs
    assert_eq!(json_body(response).await["error"], "Internal server error");
}

#[tokio::test]
async fn state_without_redis_says_so() {
    let app = app(guarded(), MockCatalogServiceTrait::new(), Some("bot-token"));

    let response = app
        .oneshot(
            Request::get("/api/cron/state")
                .header(header::AUTHORIZATION, "Bearer hunter2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "KV namespace not available");
}

#[tokio::test]
async fn health_is_healthy_without_redis() {
    let app = app(AppConfig::default(), MockCatalogServiceTrait::new(), None);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["environment"], "development");
    assert!(json["services"]["redis"].is_null());
}
