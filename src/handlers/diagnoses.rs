use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::models::{Diagnosis, DiagnosisDraft};
use crate::server::AppState;
use crate::store::StoreError;

use super::success;

/// GET /api/diagnoses - All diagnoses in the caller's partition.
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    let diagnoses = store.list_diagnoses().await?;
    Ok(success(&diagnoses).into_response())
}

/// GET /api/visits/:id/diagnoses - Diagnoses scoped to one visit; 404 when
/// the visit is not in this partition.
pub async fn list_for_visit(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(visit_id): Path<i64>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    if !store.visit_exists(visit_id).await? {
        return Err(StoreError::not_found("visit", visit_id).into());
    }
    let diagnoses = store.diagnoses_for_visit(visit_id).await?;
    Ok(success(&diagnoses).into_response())
}

/// GET /api/diagnoses/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    let diagnosis = store.get_diagnosis(id).await?;
    Ok(success(&diagnosis).into_response())
}

/// POST /api/diagnoses - The owning visit must resolve in the caller's
/// partition.
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Json(draft): Json<DiagnosisDraft>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    let diagnosis = store.create_diagnosis(draft).await?;
    Ok((StatusCode::CREATED, success(&diagnosis)).into_response())
}

/// PUT /api/diagnoses/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
    Json(diagnosis): Json<Diagnosis>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    store.update_diagnosis(id, diagnosis).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// DELETE /api/diagnoses/:id - Cascades the diagnosis's prescriptions.
pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    let outcome = store.delete_diagnosis_cascade(id).await?;
    info!(
        diagnosis_id = id,
        tenant_id = identity.tenant_id,
        prescriptions = outcome.prescriptions,
        "diagnosis deleted with dependents"
    );
    Ok(StatusCode::NO_CONTENT.into_response())
}
