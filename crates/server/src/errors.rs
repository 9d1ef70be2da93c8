use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::StoreError;
use thiserror::Error;
use tracing::error;

use crate::metrics;

/// Storage failure surfaced to an HTTP client.
///
/// The client sees a fixed message per route; the cause goes to the log.
#[derive(Debug)]
pub struct ApiError {
    message: &'static str,
    source: StoreError,
}

impl ApiError {
    pub const VISIT_FAILED: &'static str = "Failed to update visitor count";
    pub const COUNT_FAILED: &'static str = "Failed to get visitor count";

    pub fn visit(source: StoreError) -> Self {
        Self { message: Self::VISIT_FAILED, source }
    }

    pub fn count(source: StoreError) -> Self {
        Self { message: Self::COUNT_FAILED, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        metrics::STORAGE_ERRORS_TOTAL.inc();
        error!(
            error = %self.source,
            malformed = self.source.is_malformed(),
            "{}", self.message
        );
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        (status, Json(ErrorBody::new(self.message))).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("counter storage unavailable: {0}")]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
