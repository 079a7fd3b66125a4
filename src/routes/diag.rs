//! Diagnostic endpoints that push telemetry through the monitoring pipeline.
//!
//! Each handler emits one item and requests a flush. Neither waits for
//! delivery: a 200 only means the client accepted the item.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::instrument;

use crate::config::{DIAG_EVENT_NAME, DIAG_TRACE_LABEL, DIAG_TRACE_SOURCE};
use crate::error::AppError;
use crate::state::AppState;
use crate::telemetry::{EventTelemetry, SeverityLevel, TelemetryClient, TraceTelemetry};

#[derive(Debug, Serialize)]
pub struct SentResponse {
    pub ok: bool,
    pub sent: &'static str,
}

impl SentResponse {
    fn sent(label: &'static str) -> Json<Self> {
        Json(Self {
            ok: true,
            sent: label,
        })
    }
}

fn client(state: &AppState) -> Result<&Arc<dyn TelemetryClient>, AppError> {
    state.telemetry.as_ref().ok_or(AppError::TelemetryUnavailable)
}

/// Emit the `DiagPing` event.
#[instrument(name = "diag::event", skip(state))]
pub async fn event(State(state): State<AppState>) -> Result<Json<SentResponse>, AppError> {
    let client = client(&state)?;
    client.track_event(EventTelemetry::new(DIAG_EVENT_NAME))?;
    client.flush()?;
    tracing::debug!(event = DIAG_EVENT_NAME, "Diagnostic event queued");
    Ok(SentResponse::sent(DIAG_EVENT_NAME))
}

/// Emit an Information trace carrying the configured message.
#[instrument(name = "diag::trace", skip(state))]
pub async fn trace(State(state): State<AppState>) -> Result<Json<SentResponse>, AppError> {
    let client = client(&state)?;
    let trace = TraceTelemetry::new(state.config.site.message.clone(), SeverityLevel::Information)
        .with_property("source", DIAG_TRACE_SOURCE);
    client.track_trace(trace)?;
    client.flush()?;
    tracing::debug!("Diagnostic trace queued");
    Ok(SentResponse::sent(DIAG_TRACE_LABEL))
}
