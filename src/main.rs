//! appdiag: health-check and diagnostics server.
//!
//! This is the application entry point. It initializes tracing, installs the
//! fatal panic policy, loads configuration from the environment, starts the
//! telemetry client when a connection string is present, sends the startup
//! event, and serves HTTP until SIGINT/SIGTERM. Buffered telemetry is drained
//! before the process exits.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appdiag::config::{
    AppConfig, DEFAULT_LOG_FILTER, DEFAULT_LOG_FORMAT, STARTUP_EVENT_NAME,
    TELEMETRY_DRAIN_TIMEOUT_SECS,
};
use appdiag::http::start_server;
use appdiag::telemetry::{AppInsightsClient, ConnectionString, EventTelemetry, TelemetryClient};
use appdiag::{create_router, install_panic_policy, AppState};

/// appdiag: health-check and diagnostics server
#[derive(Parser, Debug)]
#[command(name = "appdiag", version, about)]
struct Args {
    /// Log level filter (e.g., "appdiag=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = DEFAULT_LOG_FORMAT, value_parser = ["text", "json"])]
    log_format: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);
    install_panic_policy();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error, exiting");
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing with priority: CLI > env > default
fn init_tracing(args: &Args) {
    let log_filter = args
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));

    if args.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        port = config.http.port,
        env = %config.site.env_label,
        telemetry = config.telemetry.connection_string.is_some(),
        "Loaded configuration"
    );

    let client = match config.telemetry.connection_string.as_deref() {
        Some(raw) => {
            let connection: ConnectionString = raw.parse()?;
            let (client, _worker) = AppInsightsClient::start(connection, &config.telemetry)?;
            send_startup_event(&client);
            Some(client)
        }
        None => {
            tracing::warn!("No monitoring connection string configured, telemetry disabled");
            None
        }
    };

    let telemetry = client
        .clone()
        .map(|c| Arc::new(c) as Arc<dyn TelemetryClient>);
    let http_config = config.http.clone();
    let app = create_router(AppState::new(config, telemetry));

    let served = start_server(app, &http_config).await;

    if let Some(client) = client {
        if client
            .drain(Duration::from_secs(TELEMETRY_DRAIN_TIMEOUT_SECS))
            .await
        {
            tracing::info!("Telemetry drained");
        } else {
            tracing::warn!("Telemetry drain timed out, buffered items may be lost");
        }
    }

    served?;
    Ok(())
}

/// Emit one event at startup so ingestion can be verified end to end.
fn send_startup_event(client: &AppInsightsClient) {
    let sent = client
        .track_event(EventTelemetry::new(STARTUP_EVENT_NAME))
        .and_then(|()| client.flush());
    match sent {
        Ok(()) => tracing::info!("Telemetry test event sent."),
        Err(e) => tracing::warn!(error = %e, "Failed to send telemetry test event"),
    }
}
