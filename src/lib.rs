//! appdiag: health-check and diagnostics server.
//!
//! Serves a landing page, a liveness probe and two diagnostic routes that push
//! telemetry to Application Insights. Configuration is read once from the
//! environment; the telemetry client is optional and shared by all handlers.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::AppConfig;
pub use error::AppError;
pub use lifecycle::install_panic_policy;
pub use routes::create_router;
pub use state::AppState;
