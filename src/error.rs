//! Per-request errors.
//!
//! Only the diagnostic routes can fail. Every failure becomes a 500 with a
//! JSON body `{ok: false, error}` so that a broken telemetry pipeline never
//! takes the server down with it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::telemetry::TelemetryError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No monitoring connection string was configured at startup
    #[error("no defaultClient")]
    TelemetryUnavailable,

    #[error("{0}")]
    Telemetry(#[from] TelemetryError),
}

/// Error body shared by the diagnostic routes.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::TelemetryUnavailable => {
                tracing::warn!("Diagnostic request without a telemetry client");
            }
            AppError::Telemetry(e) => {
                tracing::error!(error = %e, "Telemetry call failed");
            }
        }

        let body = ErrorBody {
            ok: false,
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
