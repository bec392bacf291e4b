pub mod diagnoses;
pub mod prescriptions;
pub mod visits;

use axum::response::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Standard success envelope shared by every data endpoint.
pub(crate) fn success<T: Serialize>(data: &T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}
