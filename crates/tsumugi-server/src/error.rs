use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tsumugi_api::AniListError;
use tsumugi_core::TsumugiError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned by a request handler, rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = self.status.as_u16(), error = %self.message, "request failed");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<AniListError> for ApiError {
    fn from(err: AniListError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.to_string())
    }
}

/// Startup failures of the binary.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] TsumugiError),

    #[error("upstream client error: {0}")]
    Upstream(#[from] AniListError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_error_severity() {
        let cases = [
            (AniListError::Transport("reset".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AniListError::EmptyResults, StatusCode::NOT_FOUND),
            (AniListError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AniListError::Unsupported("x".into()), StatusCode::NOT_IMPLEMENTED),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_message_keeps_subsystem_prefix() {
        let err = ApiError::from(AniListError::NoPage);
        assert_eq!(err.message, "[AniList] did not receive any page data");
    }
}
