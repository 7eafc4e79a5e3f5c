use axum::Extension;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::{debug, warn};

use crate::server::error::Error;
use crate::server::services::edge_services::EdgeServices;

/// gate for the cron routes, open when no CRON_SECRET is configured
pub struct CronAuthentication(pub EdgeServices);

/// compares every byte so the time taken doesn't say how much of the secret matched
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn is_authorized_cron_call(secret: Option<&str>, authorization: Option<&str>) -> bool {
    match secret {
        None => true,
        Some(secret) => {
            let expected = format!("Bearer {}", secret);
            authorization.is_some_and(|value| constant_time_eq(value.as_bytes(), expected.as_bytes()))
        }
    }
}

impl<S> FromRequestParts<S> for CronAuthentication
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(services): Extension<EdgeServices> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|err| Error::InternalServerErrorWithContext(err.to_string()))?;

        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        if !is_authorized_cron_call(services.config.cron_secret(), authorization) {
            warn!("rejected cron call to {}", parts.uri.path());
            return Err(Error::Unauthorized);
        }

        debug!("cron call to {} accepted", parts.uri.path());
        Ok(CronAuthentication(services))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_without_secret() {
        assert!(is_authorized_cron_call(None, None));
        assert!(is_authorized_cron_call(None, Some("Bearer whatever")));
    }

    #[test]
    fn secret_needs_exact_bearer() {
        let secret = Some("hunter2");
        assert!(is_authorized_cron_call(secret, Some("Bearer hunter2")));
        assert!(!is_authorized_cron_call(secret, Some("Bearer hunter3")));
        assert!(!is_authorized_cron_call(secret, Some("hunter2")));
        assert!(!is_authorized_cron_call(secret, None));
    }
}
