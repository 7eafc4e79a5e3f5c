use axum::Extension;
use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::error;

use crate::logger::Logger;
use crate::server::dtos::health_dto::{
    HealthResponse, HealthStatus, RedisHealth, ServiceHealthDetails,
};
use crate::server::services::edge_services::EdgeServices;
use crate::server::{get_app_version, get_uptime_seconds};

/// health endpoint, redis is the only dependency worth checking
///
/// without redis the relay still works fine, notifications just lose their memory, so a broken
/// redis only degrades the service
pub async fn health_endpoint(
    Extension(services): Extension<EdgeServices>,
) -> (StatusCode, Json<HealthResponse>) {
    let redis_health = match &services.redis {
        Some(redis) => Some(match redis.health_check().await {
            Ok(response_time) => RedisHealth {
                status: HealthStatus::Healthy,
                response_time_ms: response_time,
            },
            Err(e) => {
                error!("Redis health check failed: {}", e);
                RedisHealth {
                    status: HealthStatus::Unhealthy,
                    response_time_ms: 0.0,
                }
            }
        }),
        None => None,
    };

    let overall_status = match &redis_health {
        Some(redis) if redis.status == HealthStatus::Unhealthy => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    };

    let response = HealthResponse {
        status: overall_status,
        timestamp: Utc::now(),
        uptime_seconds: get_uptime_seconds(),
        version: get_app_version().to_string(),
        environment: Logger::environment_name(services.config.cargo_env).to_string(),
        services: ServiceHealthDetails {
            redis: redis_health,
        },
    };

    let http_status = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(response))
}
