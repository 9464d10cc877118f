//! # API REST
//!
//! HTTP surface for Aarogyam.
//!
//! Handles:
//! - Twilio voice webhooks under `/ivr`, answered with TwiML
//! - The prescriptions JSON endpoint used by the web portal
//! - OpenAPI/Swagger documentation for the JSON endpoints
//! - Hosting the built portal with a client-side routing fallback
//! - The error boundary: panics and internal errors become a plain 500
//!
//! Call logic lives in `aarogyam-core`; handlers here only extract input and encode output.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod ivr;
pub mod prescriptions;
pub mod settings;
pub mod spa;

use aarogyam_core::constants::{
    ABHA_ENTRY_PATH, LANGUAGE_SELECTION_PATH, MENU_SELECTION_PATH, WELCOME_PATH,
};
use aarogyam_core::{IvrMachine, MedicationEntry, PrescriptionRecord, PrescriptionStatus};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub use error::{ApiError, ApiResult};
pub use settings::ServerSettings;

/// Application state for the REST API server
///
/// Shared by every handler. Both fields are read-only after startup.
#[derive(Clone)]
pub struct AppState {
    machine: IvrMachine,
    dist_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(machine: IvrMachine, dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            machine,
            dist_dir: Arc::new(dist_dir.into()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, prescriptions::list_prescriptions),
    components(schemas(HealthRes, PrescriptionRecord, MedicationEntry, PrescriptionStatus))
)]
pub struct ApiDoc;

/// Build the full HTTP application.
///
/// Routes are matched first; anything unmatched is served from the dist directory, then falls
/// back to the portal shell. Voice webhooks only answer `POST`; other methods on their paths are
/// handed to the portal like any unmatched path.
pub fn router(state: AppState) -> Router {
    let portal = spa::service(state.dist_dir.clone());

    Router::new()
        .route("/health", get(health))
        .route(
            WELCOME_PATH,
            post(ivr::welcome).fallback_service(portal.clone()),
        )
        .route(
            LANGUAGE_SELECTION_PATH,
            post(ivr::handle_language_selection).fallback_service(portal.clone()),
        )
        .route(
            ABHA_ENTRY_PATH,
            post(ivr::handle_abha_id).fallback_service(portal.clone()),
        )
        .route(
            MENU_SELECTION_PATH,
            post(ivr::handle_menu_selection).fallback_service(portal.clone()),
        )
        .route(
            "/api/prescriptions/:abhaId",
            get(prescriptions::list_prescriptions),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback_service(portal)
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Aarogyam REST API is alive".into(),
    })
}
