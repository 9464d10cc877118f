//! Prescriptions JSON endpoint for the web portal.

use crate::error::ApiResult;
use crate::AppState;
use aarogyam_core::{AbhaId, PrescriptionRecord};
use axum::{
    extract::{Path as AxumPath, State},
    response::Json,
};

#[utoipa::path(
    get,
    path = "/api/prescriptions/{abhaId}",
    params(
        ("abhaId" = String, Path, description = "ABHA id of the patient")
    ),
    responses(
        (status = 200, description = "Prescriptions, latest first", body = [PrescriptionRecord]),
        (status = 500, description = "Internal server error")
    )
)]
/// List a patient's prescriptions
///
/// The demo data source serves the same records for every ABHA id, so the id is only logged.
///
/// # Errors
/// Returns `500 Internal Server Error` if the clinical data source fails.
#[axum::debug_handler]
pub async fn list_prescriptions(
    State(state): State<AppState>,
    AxumPath(abha_id): AxumPath<String>,
) -> ApiResult<Json<Vec<PrescriptionRecord>>> {
    let source = state.machine.source();
    let abha_id = match AbhaId::new(&abha_id) {
        Ok(id) => id,
        Err(_) => source.caller()?.abha_id,
    };
    tracing::debug!(%abha_id, "listing prescriptions");
    Ok(Json(source.prescriptions(&abha_id)?))
}
