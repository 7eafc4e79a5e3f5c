use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

pub type AppResult<T> = Result<T, Error>;

/// everything a handler can fail with, the message in each variant is what the caller sees so
/// keep internals out of them and log those instead
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    /// upstream answered with something other than 2xx, players need the real status
    #[error("Upstream error: {}", .0.as_u16())]
    Upstream(StatusCode),

    /// the relay failed somewhere after validation, context is logged only
    #[error("Proxy error")]
    Proxy(String),

    #[error("Internal server error")]
    InternalServerErrorWithContext(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Upstream(status) => *status,
            Self::Proxy(_) | Self::InternalServerErrorWithContext(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Self::Proxy(context) => error!("Proxy error: {}", context),
            Self::InternalServerErrorWithContext(context) => {
                error!("Internal server error: {}", context)
            }
            _ => {}
        }

        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
