//! Telemetry client for the monitoring backend.
//!
//! Handlers talk to the backend through the `TelemetryClient` trait. Every call
//! is fire-and-forget: items are handed to a background worker and the caller
//! never waits for network I/O. The production implementation is
//! `AppInsightsClient`, which speaks the Application Insights ingestion protocol.

mod appinsights;
mod channel;
mod connection_string;
mod envelope;

use std::collections::HashMap;
use std::time::Duration;

pub use appinsights::AppInsightsClient;
pub use connection_string::ConnectionString;

/// Trace severity, numbered as the ingestion API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityLevel {
    Verbose = 0,
    Information = 1,
    Warning = 2,
    Error = 3,
    Critical = 4,
}

impl SeverityLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A named custom event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTelemetry {
    pub name: String,
    pub properties: HashMap<String, String>,
}

impl EventTelemetry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A free-text trace message.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceTelemetry {
    pub message: String,
    pub severity: SeverityLevel,
    pub properties: HashMap<String, String>,
}

impl TraceTelemetry {
    pub fn new(message: impl Into<String>, severity: SeverityLevel) -> Self {
        Self {
            message: message.into(),
            severity,
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// One completed inbound HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTelemetry {
    pub id: String,
    /// Operation name, e.g. "GET /diag"
    pub name: String,
    pub url: String,
    pub duration: Duration,
    pub response_code: u16,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry queue is full")]
    QueueFull,

    #[error("telemetry channel is closed")]
    Closed,

    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("telemetry client error: {0}")]
    Client(String),
}

/// Sink for telemetry items.
///
/// Implementations must not block: `track_*` and `flush` only schedule work.
pub trait TelemetryClient: Send + Sync {
    fn track_event(&self, event: EventTelemetry) -> Result<(), TelemetryError>;

    fn track_trace(&self, trace: TraceTelemetry) -> Result<(), TelemetryError>;

    fn track_request(&self, request: RequestTelemetry) -> Result<(), TelemetryError>;

    /// Ask for buffered items to be sent now rather than on the batching schedule.
    fn flush(&self) -> Result<(), TelemetryError>;
}

/// Format a duration as `[d.]hh:mm:ss.fff`, the ingestion API's timespan form.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = (total_secs / 3600) % 24;
    let days = total_secs / 86400;

    if days > 0 {
        format!("{}.{:02}:{:02}:{:02}.{:03}", days, hours, mins, secs, ms)
    } else {
        format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_numbering() {
        assert_eq!(SeverityLevel::Verbose.as_u8(), 0);
        assert_eq!(SeverityLevel::Information.as_u8(), 1);
        assert_eq!(SeverityLevel::Critical.as_u8(), 4);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "00:00:00.000");
        assert_eq!(format_duration(Duration::from_millis(1234)), "00:00:01.234");
        assert_eq!(
            format_duration(Duration::from_secs(3 * 3600 + 25 * 60 + 7)),
            "03:25:07.000"
        );
        assert_eq!(
            format_duration(Duration::from_secs(2 * 86400 + 3600) + Duration::from_millis(5)),
            "2.01:00:00.005"
        );
    }

    #[test]
    fn test_builders_collect_properties() {
        let trace = TraceTelemetry::new("hello", SeverityLevel::Information)
            .with_property("source", "diag-endpoint");
        assert_eq!(trace.properties.get("source").map(String::as_str), Some("diag-endpoint"));

        let event = EventTelemetry::new("DiagPing");
        assert!(event.properties.is_empty());
    }
}
