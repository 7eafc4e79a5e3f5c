use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, error, warn};

use crate::server::{
    error::{AppResult, Error},
    utils::{
        credential_utils::SanitizedTarget,
        manifest_utils::{self, MANIFEST_CONTENT_TYPE},
        url_policy_utils::{PolicyDecision, UrlPolicy},
    },
};

/// upstream headers that make it back to the caller, everything else is dropped
pub const FORWARDED_HEADERS: [header::HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
];

const MAX_REDIRECTS: usize = 10;

pub type UpstreamStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

pub enum RelayBody {
    /// upstream bytes as they arrive, never buffered
    Streamed(UpstreamStream),
    /// a playlist with every entry pointing back at the relay
    RewrittenText(String),
}

impl std::fmt::Debug for RelayBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Streamed(_) => f.write_str("Streamed(..)"),
            Self::RewrittenText(text) => f.debug_tuple("RewrittenText").field(text).finish(),
        }
    }
}

#[derive(Debug)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: RelayBody,
}

pub type DynVideoRelayService = Arc<dyn VideoRelayServiceTrait + Send + Sync>;

#[async_trait::async_trait]
pub trait VideoRelayServiceTrait {
    /// validate -> sanitize -> forward -> transform, the caller only has to add its own headers
    async fn proxy(&self, target_url: &str, range: Option<&str>) -> AppResult<RelayResponse>;
}

pub struct VideoRelayService {
    http: reqwest::Client,
    policy: UrlPolicy,
}

impl VideoRelayService {
    pub fn new(policy: UrlPolicy) -> reqwest::Result<Self> {
        let http = Self::client_builder(policy.clone()).build()?;
        Ok(Self::with_client(http, policy))
    }

    pub fn with_client(http: reqwest::Client, policy: UrlPolicy) -> Self {
        Self { http, policy }
    }

    /// No overall timeout since a stream can legitimately run for as long as the episode does.
    /// Redirects are checked against the same policy as the original target so an allowed host
    /// can't bounce the relay somewhere internal.
    pub fn client_builder(policy: UrlPolicy) -> reqwest::ClientBuilder {
        let redirect_policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }

            match policy.evaluate_url(attempt.url().clone()) {
                PolicyDecision::Allowed(_) => attempt.follow(),
                PolicyDecision::Rejected(reason) => {
                    warn!("[VideoProxy] Blocked redirect: {}", reason);
                    attempt.stop()
                }
            }
        });

        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .redirect(redirect_policy)
    }

    fn copy_upstream_headers(upstream: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for name in FORWARDED_HEADERS {
            if let Some(value) = upstream.get(&name) {
                headers.insert(name, value.clone());
            }
        }
        headers
    }
}

#[async_trait::async_trait]
impl VideoRelayServiceTrait for VideoRelayService {
    async fn proxy(&self, target_url: &str, range: Option<&str>) -> AppResult<RelayResponse> {
        let target = match self.policy.evaluate(target_url) {
            PolicyDecision::Allowed(url) => url,
            PolicyDecision::Rejected(reason) => {
                warn!("[VideoProxy] Blocked: {} (url: {})", reason, target_url);
                return Err(Error::Forbidden("URL not allowed".to_string()));
            }
        };

        let sanitized = SanitizedTarget::from_url(&target);
        debug!("Relaying {} (range: {:?})", sanitized.url, range);

        let mut request = self.http.get(sanitized.url.clone());
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }
        if let Some(authorization) = &sanitized.authorization {
            request = request.header(header::AUTHORIZATION, authorization);
        }

        let upstream = request
            .send()
            .await
            .map_err(|e| Error::Proxy(format!("request to {} failed: {}", sanitized.url, e)))?;

        let status = upstream.status();
        if !status.is_success() {
            error!(
                "[VideoProxy] Upstream returned {} for {}",
                status, sanitized.url
            );
            return Err(Error::Upstream(status));
        }

        let mut headers = Self::copy_upstream_headers(upstream.headers());
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());

        if !manifest_utils::is_manifest(content_type, &sanitized.url) {
            debug!("Streaming {} ({:?})", sanitized.url, content_type);
            return Ok(RelayResponse {
                status,
                headers,
                body: RelayBody::Streamed(upstream.bytes_stream().boxed()),
            });
        }

        // playlists are small and have to be read whole to rewrite them, a huge one will sit in
        // memory until it's sent
        let text = upstream.text().await.map_err(|e| {
            Error::Proxy(format!("failed to read manifest {}: {}", sanitized.url, e))
        })?;
        let rewritten = manifest_utils::rewrite_manifest(&text, &sanitized.url);
        debug!(
            "Rewrote manifest {} ({} -> {} bytes)",
            sanitized.url,
            text.len(),
            rewritten.len()
        );

        // upstream length is for the original text
        headers.remove(header::CONTENT_LENGTH);
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(MANIFEST_CONTENT_TYPE),
            );
        }

        Ok(RelayResponse {
            status,
            headers,
            body: RelayBody::RewrittenText(rewritten),
        })
    }
}
