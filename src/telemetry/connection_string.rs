//! Application Insights connection string parsing.
//!
//! Format: `InstrumentationKey=<guid>;IngestionEndpoint=https://...;...`
//! Keys are case-insensitive and unknown keys are ignored. A value without any
//! `=` is accepted as a bare (legacy) instrumentation key.

use std::str::FromStr;

use crate::config::DEFAULT_INGESTION_ENDPOINT;

use super::TelemetryError;

const KEY_INSTRUMENTATION_KEY: &str = "instrumentationkey";
const KEY_INGESTION_ENDPOINT: &str = "ingestionendpoint";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub instrumentation_key: String,
    /// Base URL without trailing slash
    pub ingestion_endpoint: String,
}

impl ConnectionString {
    /// Full URL of the batch ingestion API.
    pub fn track_url(&self) -> String {
        format!("{}/v2/track", self.ingestion_endpoint)
    }
}

impl FromStr for ConnectionString {
    type Err = TelemetryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TelemetryError::InvalidConnectionString(
                "connection string is empty".to_string(),
            ));
        }

        if !raw.contains('=') {
            return Ok(Self {
                instrumentation_key: raw.to_string(),
                ingestion_endpoint: DEFAULT_INGESTION_ENDPOINT.to_string(),
            });
        }

        let mut instrumentation_key = None;
        let mut ingestion_endpoint = None;

        for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                TelemetryError::InvalidConnectionString(format!("malformed segment '{}'", pair))
            })?;
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                KEY_INSTRUMENTATION_KEY if !value.is_empty() => {
                    instrumentation_key = Some(value.to_string())
                }
                KEY_INGESTION_ENDPOINT if !value.is_empty() => {
                    ingestion_endpoint = Some(value.trim_end_matches('/').to_string())
                }
                _ => {}
            }
        }

        let instrumentation_key = instrumentation_key.ok_or_else(|| {
            TelemetryError::InvalidConnectionString("missing InstrumentationKey".to_string())
        })?;

        Ok(Self {
            instrumentation_key,
            ingestion_endpoint: ingestion_endpoint
                .unwrap_or_else(|| DEFAULT_INGESTION_ENDPOINT.to_string()),
        })
    }
}
