//! Uniform operations against one partition's clinical-record tables,
//! independent of which physical partition they target.

pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::cascade::{self, CascadeOutcome};
use crate::database::manager::PoolError;
use crate::models::{
    ClinicalVisit, Diagnosis, DiagnosisDraft, Prescription, PrescriptionDraft, VisitDraft,
};
use crate::registry::PartitionTarget;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found in this partition")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} id in path ({path}) does not match the record body ({body})")]
    IdMismatch {
        entity: &'static str,
        path: i64,
        body: i64,
    },

    #[error("{entity} {id} does not exist in this partition")]
    MissingParent { entity: &'static str, id: i64 },

    #[error("partition unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }

    pub fn missing_parent(entity: &'static str, id: i64) -> Self {
        StoreError::MissingParent { entity, id }
    }
}

/// Per-partition store contract. Update operations reject a path/body id
/// mismatch before touching storage; child creates verify the parent lives
/// in the same partition.
///
/// The two cascade operations default to the documented ordered sequence
/// (grandchildren, then children, then the parent) built from the primitive
/// operations; backends with native transactions are expected to override
/// them with an atomic equivalent.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    // -- visits -----------------------------------------------------------

    /// All visits in this partition, newest first.
    async fn list_visits(&self) -> Result<Vec<ClinicalVisit>, StoreError>;

    async fn get_visit(&self, id: i64) -> Result<ClinicalVisit, StoreError>;

    async fn create_visit(&self, draft: VisitDraft) -> Result<ClinicalVisit, StoreError>;

    /// Full replacement of an existing visit.
    async fn update_visit(&self, id: i64, visit: ClinicalVisit) -> Result<(), StoreError>;

    async fn delete_visit(&self, id: i64) -> Result<(), StoreError>;

    async fn visit_exists(&self, id: i64) -> Result<bool, StoreError>;

    // -- diagnoses --------------------------------------------------------

    async fn list_diagnoses(&self) -> Result<Vec<Diagnosis>, StoreError>;

    async fn diagnoses_for_visit(&self, visit_id: i64) -> Result<Vec<Diagnosis>, StoreError>;

    async fn get_diagnosis(&self, id: i64) -> Result<Diagnosis, StoreError>;

    async fn create_diagnosis(&self, draft: DiagnosisDraft) -> Result<Diagnosis, StoreError>;

    async fn update_diagnosis(&self, id: i64, diagnosis: Diagnosis) -> Result<(), StoreError>;

    async fn delete_diagnosis(&self, id: i64) -> Result<(), StoreError>;

    async fn diagnosis_exists(&self, id: i64) -> Result<bool, StoreError>;

    // -- prescriptions ----------------------------------------------------

    async fn prescriptions_for_diagnosis(
        &self,
        diagnosis_id: i64,
    ) -> Result<Vec<Prescription>, StoreError>;

    async fn get_prescription(&self, id: i64) -> Result<Prescription, StoreError>;

    async fn create_prescription(
        &self,
        draft: PrescriptionDraft,
    ) -> Result<Prescription, StoreError>;

    async fn update_prescription(
        &self,
        id: i64,
        prescription: Prescription,
    ) -> Result<(), StoreError>;

    async fn delete_prescription(&self, id: i64) -> Result<(), StoreError>;

    // -- cascades ---------------------------------------------------------

    /// Delete a visit together with its diagnoses and their prescriptions.
    async fn delete_visit_cascade(&self, visit_id: i64) -> Result<CascadeOutcome, StoreError> {
        cascade::delete_visit_tree(self, visit_id).await
    }

    /// Delete a diagnosis together with its prescriptions.
    async fn delete_diagnosis_cascade(
        &self,
        diagnosis_id: i64,
    ) -> Result<CascadeOutcome, StoreError> {
        cascade::delete_diagnosis_tree(self, diagnosis_id).await
    }
}

/// Resolves a registry entry to a live partition store handle.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn partition(
        &self,
        target: &PartitionTarget,
    ) -> Result<Arc<dyn PartitionStore>, StoreError>;
}
