//! Health check endpoint for container orchestration.
//!
//! Liveness probe only: it proves the process can answer HTTP and checks
//! nothing else.

/// Health check handler. Always answers `OK` as plain text.
pub async fn health() -> &'static str {
    "OK"
}
