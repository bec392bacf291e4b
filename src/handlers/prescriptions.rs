use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::models::{Prescription, PrescriptionDraft};
use crate::server::AppState;
use crate::store::StoreError;

use super::success;

/// GET /api/diagnoses/:id/prescriptions - Prescriptions scoped to one
/// diagnosis; 404 when the diagnosis is not in this partition.
pub async fn list_for_diagnosis(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(diagnosis_id): Path<i64>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    if !store.diagnosis_exists(diagnosis_id).await? {
        return Err(StoreError::not_found("diagnosis", diagnosis_id).into());
    }
    let prescriptions = store.prescriptions_for_diagnosis(diagnosis_id).await?;
    Ok(success(&prescriptions).into_response())
}

/// GET /api/prescriptions/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    let prescription = store.get_prescription(id).await?;
    Ok(success(&prescription).into_response())
}

/// POST /api/prescriptions - The owning diagnosis must resolve in the
/// caller's partition.
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Json(draft): Json<PrescriptionDraft>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    let prescription = store.create_prescription(draft).await?;
    Ok((StatusCode::CREATED, success(&prescription)).into_response())
}

/// PUT /api/prescriptions/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
    Json(prescription): Json<Prescription>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    store.update_prescription(id, prescription).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// DELETE /api/prescriptions/:id - Leaf record, no cascade.
pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    store.delete_prescription(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
