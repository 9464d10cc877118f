use api_rest::ServerSettings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Aarogyam application
///
/// Loads `.env` if present, then starts the HTTP server that answers Twilio voice webhooks,
/// serves the prescriptions API with its OpenAPI document, and hosts the built web portal.
///
/// # Environment Variables
/// - `AAROGYAM_REST_ADDR`: Server address (default: "0.0.0.0:3000"; `PORT` is honoured when unset)
/// - `AAROGYAM_DIST_DIR`: Built portal assets (default: "dist")
/// - `AAROGYAM_IVR_MODE`: `language-menu` (default) or `abha-entry`
/// - `AAROGYAM_FALLBACK_LANGUAGE`: Language for requests that carry none (default: English)
/// - `AAROGYAM_PRESCRIPTIONS_FILE`: Optional YAML clinical data set
/// - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`: Presence reported at startup
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aarogyam_run=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = ServerSettings::from_env()?;

    tracing::info!("++ Starting Aarogyam REST on {}", settings.rest_addr);
    settings.log_summary();

    api_rest::settings::serve(&settings).await
}
