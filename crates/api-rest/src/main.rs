//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the HTTP server (voice webhooks, prescriptions API, Swagger UI and portal hosting) on
//! its own.
//!
//! ## Intended use
//! Useful during development when the workspace's `aarogyam-run` binary is not wanted, for
//! example when pointing a Twilio test number at a local tunnel. Unlike `aarogyam-run` it does
//! not read a `.env` file.

use api_rest::ServerSettings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Aarogyam REST API server
///
/// See [`ServerSettings::from_env`] for the environment variables read.
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - a setting is invalid or the clinical data file cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = ServerSettings::from_env()?;

    tracing::info!("-- Starting Aarogyam REST API on {}", settings.rest_addr);
    settings.log_summary();

    api_rest::settings::serve(&settings).await
}
