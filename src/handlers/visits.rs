use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::auth::CallerIdentity;
use crate::catalog;
use crate::error::ApiError;
use crate::models::{ClinicalVisit, VisitDraft};
use crate::policy;
use crate::server::AppState;

use super::success;

/// GET /api/visits - The caller's partition, newest first; administrators at
/// the aggregation root (who are not clinicians) get the all-sites view.
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
) -> Result<Response, ApiError> {
    if policy::federated_view_allowed(&identity, &state.registry) {
        let merged = state.federation.list_all_visits().await;
        return Ok(success(&merged.visits).into_response());
    }

    let store = state.partition_store(&identity).await?;
    let visits = store.list_visits().await?;
    Ok(success(&visits).into_response())
}

/// GET /api/visits/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    let visit = store.get_visit(id).await?;
    Ok(success(&visit).into_response())
}

/// POST /api/visits - Catalog references are validated before the partition
/// sees the write, so a bad reference can never leave a partial record.
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Json(draft): Json<VisitDraft>,
) -> Result<Response, ApiError> {
    catalog::check_visit_references(state.catalog.as_ref(), &draft).await?;

    let store = state.partition_store(&identity).await?;
    let visit = store.create_visit(draft).await?;
    Ok((StatusCode::CREATED, success(&visit)).into_response())
}

/// PUT /api/visits/:id - Full replacement; 409 when the path and body ids
/// disagree.
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
    Json(visit): Json<ClinicalVisit>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    store.update_visit(id, visit).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// DELETE /api/visits/:id - Cascades through diagnoses and prescriptions.
pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let store = state.partition_store(&identity).await?;
    let outcome = store.delete_visit_cascade(id).await?;
    info!(
        visit_id = id,
        tenant_id = identity.tenant_id,
        diagnoses = outcome.diagnoses,
        prescriptions = outcome.prescriptions,
        "visit deleted with dependents"
    );
    Ok(StatusCode::NO_CONTENT.into_response())
}
