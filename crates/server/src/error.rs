use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tandem_core::{ErrorKind, ReconcileError};
use thiserror::Error;

use crate::api_types::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Malformed request body: {0}")]
    Body(#[from] JsonRejection),

    #[error("Malformed query string: {0}")]
    Query(#[from] QueryRejection),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Reconcile(e) => match e.kind() {
                ErrorKind::Validation | ErrorKind::InvalidPair => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::AlreadyPaired | ErrorKind::CoverageConflict => StatusCode::CONFLICT,
                ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            },
            ApiError::Body(_) | ApiError::Query(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let (kind, retryable) = match &self {
            ApiError::Reconcile(e) => (Some(e.kind()), e.is_retryable()),
            ApiError::Body(_) | ApiError::Query(_) => (None, false),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            kind,
            retryable,
        };
        (status, Json(body)).into_response()
    }
}
