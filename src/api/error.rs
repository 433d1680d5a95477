use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::cache::CacheError;
use crate::schemas::ErrorResponse;

/// Failures as the HTTP layer reports them.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    NotFound,
    /// No dump can be served right now; the client should retry later.
    Unavailable { error: String },
    RefreshBusy,
    RefreshFailed { message: String },
    Internal { message: String },
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::RefreshBusy => ApiError::RefreshBusy,
            err if err.is_retryable() => ApiError::Unavailable {
                error: err.to_string(),
            },
            CacheError::StoreIo { .. } => ApiError::Internal {
                message: err.to_string(),
            },
            err => ApiError::RefreshFailed {
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, ErrorResponse::new("Unauthorized")),
            ApiError::NotFound => (StatusCode::NOT_FOUND, ErrorResponse::new("Not found")),
            ApiError::Unavailable { error } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new(error).retryable(),
            ),
            ApiError::RefreshBusy => (
                StatusCode::CONFLICT,
                ErrorResponse::new("Refresh already in progress").refreshing(),
            ),
            ApiError::RefreshFailed { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Refresh failed").with_message(message),
            ),
            ApiError::Internal { message } => {
                tracing::error!("Request failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cache_errors_map_to_statuses() {
        let cases = [
            (CacheError::NotAvailable, StatusCode::SERVICE_UNAVAILABLE),
            (
                CacheError::MissingFile {
                    path: PathBuf::from("dump-1.tar.gz"),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (CacheError::RefreshBusy, StatusCode::CONFLICT),
            (
                CacheError::Generation {
                    status: "exit status: 1".into(),
                    stderr: "boom".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn every_retryable_error_except_busy_is_unavailable() {
        let errors = [
            CacheError::NotAvailable,
            CacheError::MissingFile {
                path: PathBuf::from("dump-1.tar.gz"),
            },
            CacheError::RefreshBusy,
            CacheError::Aborted("dump generator panicked".into()),
            CacheError::store_io("dumps", std::io::Error::other("disk full")),
        ];

        for err in errors {
            let retryable = err.is_retryable();
            let busy = matches!(err, CacheError::RefreshBusy);
            let unavailable = matches!(ApiError::from(err), ApiError::Unavailable { .. });
            assert_eq!(unavailable, retryable && !busy);
        }
    }
}
