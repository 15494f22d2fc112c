//! Response helpers and the error-to-response mapping.
//!
//! # Responsibilities
//! - Map unmatched routes to 404 and unhandled failures to 500
//! - Keep error bodies JSON, like every other response
//! - Produce timestamps in one format
//!
//! # Design Decisions
//! - Clients get a fixed error body; details only go to the logs
//! - A panicking handler is a 500, not a process failure

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::any::Any;
use thiserror::Error;

/// Errors a request can end in.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no route for {path}")]
    NotFound { path: String },

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct NotFoundBody<'a> {
    error: &'static str,
    path: &'a str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound { path } => (
                StatusCode::NOT_FOUND,
                Json(NotFoundBody {
                    error: "Not Found",
                    path: &path,
                }),
            )
                .into_response(),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "Internal Server Error",
                    }),
                )
                    .into_response()
            }
        }
    }
}

/// Turn a caught handler panic into a 500.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(detail).into_response()
}

/// Current time as RFC 3339 UTC with milliseconds, e.g. `2024-05-01T12:00:00.000Z`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
