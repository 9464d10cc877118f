//! Error boundary for HTTP handlers.
//!
//! Internal failures are logged in full and answered with a fixed, detail-free body. Callers
//! hitting a voice webhook never receive a stack trace read back to them.

use aarogyam_core::CoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::any::Any;

/// Body of every 500 response.
pub const INTERNAL_ERROR_BODY: &str = "Something broke!";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("request failed: {self}");
        internal_error()
    }
}

/// Panic handler for `CatchPanicLayer`.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!("handler panicked: {detail}");
    internal_error()
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
}
