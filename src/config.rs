//! Configuration loading and constants.
//!
//! All settings come from environment variables and are read exactly once at
//! startup into an immutable `AppConfig`, which is then shared with handlers
//! through `AppState`. Lookups go through a caller-supplied function so tests
//! can build a configuration without touching the process environment.

use std::time::Duration;

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Monitoring connection string variables, checked in order (first non-empty wins)
pub const ENV_CONNECTION_STRING_VARS: [&str; 2] = [
    "APPINSIGHTS_CONNECTIONSTRING",
    "APPLICATIONINSIGHTS_CONNECTION_STRING",
];

/// Listen port
pub const ENV_PORT: &str = "PORT";

/// Storage connection string, only ever shown masked
pub const ENV_STORAGE_CONN: &str = "STORAGE_CONN";

/// Environment label reported by the landing page
pub const ENV_APP_ENV: &str = "APP_ENV";

/// Landing page and diagnostic trace message
pub const ENV_APP_MESSAGE: &str = "APP_MESSAGE";

// =============================================================================
// Defaults
// =============================================================================

/// Default listen host (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port when PORT is unset or empty
pub const DEFAULT_PORT: u16 = 8080;

/// Placeholder shown when STORAGE_CONN is unset
pub const DEFAULT_STORAGE_CONN: &str = "(not set)";

pub const DEFAULT_ENV_LABEL: &str = "staging";

pub const DEFAULT_MESSAGE: &str = "CI redeploy test 20:13:45Z";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "appdiag=debug,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

// =============================================================================
// Masking
// =============================================================================

/// Number of leading characters kept when masking a secret
pub const MASK_VISIBLE_CHARS: usize = 20;

/// Marker appended to every masked value
pub const MASK_SUFFIX: &str = "...";

// =============================================================================
// Telemetry
// =============================================================================

/// Event emitted once at startup to verify the ingestion pipeline
pub const STARTUP_EVENT_NAME: &str = "ManualStartupTest";

/// Event emitted by GET /diag
pub const DIAG_EVENT_NAME: &str = "DiagPing";

/// Label returned by GET /diag/trace
pub const DIAG_TRACE_LABEL: &str = "manual-trace";

/// `source` property attached to the diagnostic trace
pub const DIAG_TRACE_SOURCE: &str = "diag-endpoint";

/// Ingestion endpoint used when the connection string does not name one
pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";

/// Percentage of telemetry items kept by sampling
pub const TELEMETRY_SAMPLING_PERCENTAGE: f64 = 100.0;

/// Buffered items that trigger an immediate send
pub const TELEMETRY_MAX_BATCH_SIZE: usize = 250;

/// Interval in seconds between scheduled sends of buffered items
pub const TELEMETRY_FLUSH_INTERVAL_SECS: u64 = 15;

/// Capacity of the queue between request handlers and the telemetry worker
pub const TELEMETRY_QUEUE_CAPACITY: usize = 1000;

/// Timeout in seconds for one ingestion POST
pub const TELEMETRY_SEND_TIMEOUT_SECS: u64 = 10;

/// Upper bound in seconds on draining telemetry after the server stops
pub const TELEMETRY_DRAIN_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// HTTP Server
// =============================================================================

/// Grace period in seconds for open connections after SIGINT/SIGTERM
pub const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listener configuration
    pub http: HttpServerConfig,
    /// Landing page content
    pub site: SiteConfig,
    /// Monitoring client configuration
    pub telemetry: TelemetrySettings,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

/// Values reported by the landing page
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Environment label (e.g. "staging")
    pub env_label: String,
    /// Static message, also used as the diagnostic trace text
    pub message: String,
    /// Storage connection string; never rendered unmasked
    pub storage_connection: String,
}

impl SiteConfig {
    /// Masked display form of the storage connection string.
    pub fn storage_connection_masked(&self) -> String {
        mask_secret(&self.storage_connection)
    }
}

/// Telemetry client settings.
///
/// `connection_string` is `None` when no monitoring backend is configured, in
/// which case no client is started and the diagnostic routes report it missing.
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub connection_string: Option<String>,
    /// Record one request item per inbound HTTP request
    pub auto_collect_requests: bool,
    /// Record outbound dependency calls
    pub auto_collect_dependencies: bool,
    /// Stream live metrics
    pub live_metrics: bool,
    pub sampling_percentage: f64,
    pub max_batch_size: usize,
    pub flush_interval: Duration,
    pub queue_capacity: usize,
    pub send_timeout: Duration,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            connection_string: None,
            auto_collect_requests: true,
            auto_collect_dependencies: true,
            live_metrics: true,
            sampling_percentage: TELEMETRY_SAMPLING_PERCENTAGE,
            max_batch_size: TELEMETRY_MAX_BATCH_SIZE,
            flush_interval: Duration::from_secs(TELEMETRY_FLUSH_INTERVAL_SECS),
            queue_capacity: TELEMETRY_QUEUE_CAPACITY,
            send_timeout: Duration::from_secs(TELEMETRY_SEND_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let connection_string = ENV_CONNECTION_STRING_VARS
            .iter()
            .find_map(|&key| non_empty(key));

        let port = match non_empty(ENV_PORT) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            http: HttpServerConfig {
                host: DEFAULT_HOST.to_string(),
                port,
            },
            site: SiteConfig {
                env_label: non_empty(ENV_APP_ENV).unwrap_or_else(|| DEFAULT_ENV_LABEL.to_string()),
                message: non_empty(ENV_APP_MESSAGE).unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
                storage_connection: non_empty(ENV_STORAGE_CONN)
                    .unwrap_or_else(|| DEFAULT_STORAGE_CONN.to_string()),
            },
            telemetry: TelemetrySettings {
                connection_string,
                ..TelemetrySettings::default()
            },
        })
    }
}

/// Mask a secret-bearing value for display.
///
/// Keeps the first `MASK_VISIBLE_CHARS` characters and always appends
/// `MASK_SUFFIX`, even when the value is shorter than that.
pub fn mask_secret(value: &str) -> String {
    let mut masked: String = value.chars().take(MASK_VISIBLE_CHARS).collect();
    masked.push_str(MASK_SUFFIX);
    masked
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value '{0}': expected a port number")]
    InvalidPort(String),
}
