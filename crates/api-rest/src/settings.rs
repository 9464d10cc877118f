//! Server settings resolved from the environment at startup.

use aarogyam_core::config::{
    fallback_language_from_env_value, ivr_mode_from_env_value, load_clinical_source,
};
use aarogyam_core::{IvrConfig, IvrMachine};
use std::path::PathBuf;

use crate::AppState;

pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Everything the server needs, read once before it starts listening.
#[derive(Clone, Debug)]
pub struct ServerSettings {
    pub rest_addr: String,
    pub dist_dir: PathBuf,
    pub ivr: IvrConfig,
    pub prescriptions_file: Option<PathBuf>,
    pub twilio_configured: bool,
}

impl ServerSettings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    /// - `AAROGYAM_REST_ADDR`: Server address (default: "0.0.0.0:3000")
    /// - `PORT`: Port on all interfaces, used when `AAROGYAM_REST_ADDR` is unset
    /// - `AAROGYAM_DIST_DIR`: Built portal assets (default: "dist")
    /// - `AAROGYAM_IVR_MODE`: `language-menu` (default) or `abha-entry`
    /// - `AAROGYAM_FALLBACK_LANGUAGE`: Language for requests without one (default: English)
    /// - `AAROGYAM_PRESCRIPTIONS_FILE`: YAML clinical data set replacing the built-in demo data
    /// - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`: Reported at startup only
    ///
    /// # Errors
    /// Returns an error if the IVR mode or fallback language is not recognised.
    pub fn from_env() -> anyhow::Result<Self> {
        let var = |name: &str| std::env::var(name).ok();

        let mode = ivr_mode_from_env_value(var("AAROGYAM_IVR_MODE"))?;
        let fallback_language = fallback_language_from_env_value(var("AAROGYAM_FALLBACK_LANGUAGE"))?;

        Ok(Self {
            rest_addr: rest_addr_from_env_values(var("AAROGYAM_REST_ADDR"), var("PORT")),
            dist_dir: var("AAROGYAM_DIST_DIR")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DIST_DIR.into())
                .into(),
            ivr: IvrConfig::new(mode, fallback_language),
            prescriptions_file: var("AAROGYAM_PRESCRIPTIONS_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            twilio_configured: var("TWILIO_ACCOUNT_SID").is_some()
                && var("TWILIO_AUTH_TOKEN").is_some(),
        })
    }

    /// Load the clinical data source and build handler state.
    ///
    /// # Errors
    /// Returns an error if a configured clinical data file cannot be read or is invalid.
    pub fn build_state(&self) -> anyhow::Result<AppState> {
        let source = load_clinical_source(self.prescriptions_file.clone())?;
        Ok(AppState::new(
            IvrMachine::new(self.ivr, source),
            self.dist_dir.clone(),
        ))
    }

    /// Log the resolved settings.
    pub fn log_summary(&self) {
        tracing::info!("-- IVR mode: {}", self.ivr.mode());
        tracing::info!("-- Fallback language: {}", self.ivr.fallback_language());
        tracing::info!("-- Serving portal from {}", self.dist_dir.display());
        if self.twilio_configured {
            tracing::info!("-- Twilio credentials present");
        } else {
            tracing::warn!("-- Twilio credentials not set");
        }
    }
}

/// Resolve the listen address.
///
/// An explicit address wins; otherwise `PORT` binds all interfaces; otherwise the default.
pub fn rest_addr_from_env_values(addr: Option<String>, port: Option<String>) -> String {
    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    match (non_blank(addr), non_blank(port)) {
        (Some(addr), _) => addr,
        (None, Some(port)) => format!("0.0.0.0:{port}"),
        (None, None) => DEFAULT_REST_ADDR.into(),
    }
}

/// Bind and run the HTTP server until it fails.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(settings: &ServerSettings) -> anyhow::Result<()> {
    let state = settings.build_state()?;
    let app = crate::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.rest_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
