//! API 错误类型及其与仓库错误之间的映射。

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::storage::StoreError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
    Unavailable(String),
    Unauthorized(HeaderMap),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg).into_response(),
            ApiError::Unauthorized(headers) => {
                (StatusCode::UNAUTHORIZED, headers, "unauthorized").into_response()
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidName(_) => ApiError::BadRequest(err.to_string()),
            StoreError::TransferInterrupted(_) => {
                warn!(error = %err, "upload aborted");
                ApiError::BadRequest(err.to_string())
            }
            StoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StoreError::NameConflict(_) => ApiError::Conflict(err.to_string()),
            StoreError::WriteFailed(_) => {
                error!(error = %err, "write to repository failed");
                ApiError::Internal("write failed".into())
            }
            StoreError::StoreUnavailable(_) => {
                error!(error = %err, "repository unavailable");
                ApiError::Unavailable("storage unavailable".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn status_of(err: StoreError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn store_errors_map_to_status_codes() {
        assert_eq!(status_of(StoreError::InvalidName("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(StoreError::NotFound("a".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(StoreError::NameConflict("a".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(StoreError::TransferInterrupted("reset".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(StoreError::WriteFailed(io::Error::other("disk full"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(StoreError::StoreUnavailable(io::Error::other("gone"))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
