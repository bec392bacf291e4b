use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::CallerIdentity;
use crate::catalog::CatalogDirectory;
use crate::config;
use crate::database::manager::PoolManager;
use crate::error::ApiError;
use crate::federation::FederationEngine;
use crate::handlers::{diagnoses, prescriptions, visits};
use crate::middleware::jwt_auth_middleware;
use crate::registry::PartitionRegistry;
use crate::store::{PartitionStore, StoreProvider};

/// Shared request context: the immutable registry plus the pluggable store
/// and catalog backends.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<PartitionRegistry>,
    pub stores: Arc<dyn StoreProvider>,
    pub catalog: Arc<dyn CatalogDirectory>,
    pub federation: Arc<FederationEngine>,
}

impl AppState {
    pub fn new(
        registry: Arc<PartitionRegistry>,
        stores: Arc<dyn StoreProvider>,
        catalog: Arc<dyn CatalogDirectory>,
        fanout_timeout: Duration,
    ) -> Self {
        let federation = Arc::new(FederationEngine::new(
            registry.clone(),
            stores.clone(),
            fanout_timeout,
        ));
        Self {
            registry,
            stores,
            catalog,
            federation,
        }
    }

    /// The caller's own partition store, via registry resolution.
    pub async fn partition_store(
        &self,
        identity: &CallerIdentity,
    ) -> Result<Arc<dyn PartitionStore>, ApiError> {
        let target = self.registry.resolve(identity.tenant_id)?;
        Ok(self.stores.partition(target).await?)
    }
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/api/visits",
            get(visits::list).post(visits::create),
        )
        .route(
            "/api/visits/:id",
            get(visits::get).put(visits::update).delete(visits::remove),
        )
        .route("/api/visits/:id/diagnoses", get(diagnoses::list_for_visit))
        .route(
            "/api/diagnoses",
            get(diagnoses::list).post(diagnoses::create),
        )
        .route(
            "/api/diagnoses/:id",
            get(diagnoses::get)
                .put(diagnoses::update)
                .delete(diagnoses::remove),
        )
        .route(
            "/api/diagnoses/:id/prescriptions",
            get(prescriptions::list_for_diagnosis),
        )
        .route("/api/prescriptions", axum::routing::post(prescriptions::create))
        .route(
            "/api/prescriptions/:id",
            get(prescriptions::get)
                .put(prescriptions::update)
                .delete(prescriptions::remove),
        )
        .layer(axum::middleware::from_fn(jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(api)
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "MedCenter API",
            "version": version,
            "description": "Multi-site clinical records API with a federated admin view",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "visits": "/api/visits[/:id] (protected)",
                "diagnoses": "/api/diagnoses[/:id], /api/visits/:id/diagnoses (protected)",
                "prescriptions": "/api/prescriptions[/:id], /api/diagnoses/:id/prescriptions (protected)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();
    let catalog_db = state.registry.catalog_database();

    match PoolManager::health_check(catalog_db).await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "environment": format!("{:?}", config::config().environment),
                    "catalog": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "catalog unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "catalog_error": e.to_string()
                }
            })),
        ),
    }
}
