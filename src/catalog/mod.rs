//! Existence checks against the canonical Patient/Doctor catalog. The
//! catalog is read-only from this crate's point of view and shares the
//! aggregation root's database.

use async_trait::async_trait;
use thiserror::Error;

use crate::database::manager::{PoolError, PoolManager};
use crate::models::VisitDraft;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("patient {0} does not exist in the global catalog")]
    MissingPatient(i64),

    #[error("doctor {0} does not exist in the global catalog")]
    MissingDoctor(i64),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait CatalogDirectory: Send + Sync {
    async fn patient_exists(&self, id: i64) -> Result<bool, CatalogError>;

    async fn doctor_exists(&self, id: i64) -> Result<bool, CatalogError>;
}

/// Validate a visit draft's catalog references, one existence check per
/// reference, before any partition write is attempted. The error names the
/// reference that failed.
pub async fn check_visit_references(
    catalog: &dyn CatalogDirectory,
    draft: &VisitDraft,
) -> Result<(), CatalogError> {
    if !catalog.patient_exists(draft.patient_id).await? {
        return Err(CatalogError::MissingPatient(draft.patient_id));
    }
    if !catalog.doctor_exists(draft.doctor_id).await? {
        return Err(CatalogError::MissingDoctor(draft.doctor_id));
    }
    Ok(())
}

/// Catalog directory backed by the canonical Postgres database.
pub struct PgCatalog {
    database: String,
}

impl PgCatalog {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    async fn exists(&self, table: &str, id: i64) -> Result<bool, CatalogError> {
        let pool = PoolManager::pool(&self.database).await?;
        // Table name is one of two literals supplied below, never input.
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", table);
        let exists: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(&pool).await?;
        Ok(exists)
    }
}

#[async_trait]
impl CatalogDirectory for PgCatalog {
    async fn patient_exists(&self, id: i64) -> Result<bool, CatalogError> {
        self.exists("patients", id).await
    }

    async fn doctor_exists(&self, id: i64) -> Result<bool, CatalogError> {
        self.exists("doctors", id).await
    }
}
