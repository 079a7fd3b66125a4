//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::telemetry::TelemetryClient;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Both fields are read-only after startup. `telemetry` is `None` when no
/// monitoring connection string was configured.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub telemetry: Option<Arc<dyn TelemetryClient>>,
}

impl AppState {
    /// Creates a new application state from the given configuration and optional telemetry client.
    pub fn new(config: AppConfig, telemetry: Option<Arc<dyn TelemetryClient>>) -> Self {
        Self {
            config: Arc::new(config),
            telemetry,
        }
    }
}
