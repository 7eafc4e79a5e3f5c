use axum::{
    Extension, Router,
    body::Body,
    extract::Query,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::debug;

use crate::server::{
    error::{AppResult, Error},
    services::{
        edge_services::EdgeServices,
        video_relay_services::{RelayBody, RelayResponse},
    },
    utils::manifest_utils::RELAY_PATH,
};

#[derive(Deserialize)]
struct ProxyQuery {
    url: Option<String>,
}

pub struct ProxyController;

impl ProxyController {
    pub fn app() -> Router {
        Router::new().route(RELAY_PATH, get(Self::proxy_get).options(Self::proxy_options))
    }

    /// fixed set every relay answer carries so players on other origins can seek
    pub fn relay_cors_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Range"),
        );
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("Content-Range, Content-Length, Accept-Ranges"),
        );
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600"),
        );
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers
    }

    async fn proxy_get(
        Extension(services): Extension<EdgeServices>,
        Query(params): Query<ProxyQuery>,
        headers: HeaderMap,
    ) -> AppResult<Response> {
        let target_url = params
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::BadRequest("Missing url parameter".to_string()))?;

        // range is the only thing from the caller that goes upstream
        let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

        let relayed = services.relay.proxy(&target_url, range).await?;
        Ok(Self::build_response(relayed))
    }

    async fn proxy_options() -> impl IntoResponse {
        (StatusCode::NO_CONTENT, Self::relay_cors_headers())
    }

    fn build_response(relayed: RelayResponse) -> Response {
        let RelayResponse {
            status,
            mut headers,
            body,
        } = relayed;

        // fixed headers win over whatever upstream said (accept-ranges mostly)
        headers.extend(Self::relay_cors_headers());

        let body = match body {
            RelayBody::Streamed(stream) => Body::from_stream(stream),
            RelayBody::RewrittenText(text) => {
                debug!("Sending rewritten manifest ({} bytes)", text.len());
                Body::from(text)
            }
        };

        (status, headers, body).into_response()
    }
}
