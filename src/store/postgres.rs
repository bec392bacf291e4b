//! Postgres-backed partition store. One instance wraps one partition's
//! connection pool; which physical partition that is was decided by the
//! registry before construction.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::cascade::CascadeOutcome;
use crate::database::manager::PoolManager;
use crate::models::{
    ClinicalVisit, Diagnosis, DiagnosisDraft, Prescription, PrescriptionDraft, VisitDraft,
};
use crate::registry::PartitionTarget;
use crate::store::{PartitionStore, StoreError, StoreProvider};

pub struct PgPartitionStore {
    pool: PgPool,
}

impl PgPartitionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PartitionStore for PgPartitionStore {
    async fn list_visits(&self) -> Result<Vec<ClinicalVisit>, StoreError> {
        let visits = sqlx::query_as::<_, ClinicalVisit>(
            "SELECT id, patient_id, doctor_id, reason, occurred_at \
             FROM clinical_visits ORDER BY occurred_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(visits)
    }

    async fn get_visit(&self, id: i64) -> Result<ClinicalVisit, StoreError> {
        sqlx::query_as::<_, ClinicalVisit>(
            "SELECT id, patient_id, doctor_id, reason, occurred_at \
             FROM clinical_visits WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::not_found("visit", id))
    }

    async fn create_visit(&self, draft: VisitDraft) -> Result<ClinicalVisit, StoreError> {
        let visit = sqlx::query_as::<_, ClinicalVisit>(
            "INSERT INTO clinical_visits (patient_id, doctor_id, reason, occurred_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, patient_id, doctor_id, reason, occurred_at",
        )
        .bind(draft.patient_id)
        .bind(draft.doctor_id)
        .bind(draft.reason())
        .bind(draft.occurred_at())
        .fetch_one(&self.pool)
        .await?;
        Ok(visit)
    }

    async fn update_visit(&self, id: i64, visit: ClinicalVisit) -> Result<(), StoreError> {
        if id != visit.id {
            return Err(StoreError::IdMismatch {
                entity: "visit",
                path: id,
                body: visit.id,
            });
        }

        let result = sqlx::query(
            "UPDATE clinical_visits \
             SET patient_id = $2, doctor_id = $3, reason = $4, occurred_at = $5 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(visit.patient_id)
        .bind(visit.doctor_id)
        .bind(&visit.reason)
        .bind(visit.occurred_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("visit", id));
        }
        Ok(())
    }

    async fn delete_visit(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM clinical_visits WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("visit", id));
        }
        Ok(())
    }

    async fn visit_exists(&self, id: i64) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clinical_visits WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_diagnoses(&self) -> Result<Vec<Diagnosis>, StoreError> {
        let diagnoses = sqlx::query_as::<_, Diagnosis>(
            "SELECT id, visit_id, description FROM diagnoses ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(diagnoses)
    }

    async fn diagnoses_for_visit(&self, visit_id: i64) -> Result<Vec<Diagnosis>, StoreError> {
        let diagnoses = sqlx::query_as::<_, Diagnosis>(
            "SELECT id, visit_id, description FROM diagnoses WHERE visit_id = $1 ORDER BY id",
        )
        .bind(visit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(diagnoses)
    }

    async fn get_diagnosis(&self, id: i64) -> Result<Diagnosis, StoreError> {
        sqlx::query_as::<_, Diagnosis>(
            "SELECT id, visit_id, description FROM diagnoses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::not_found("diagnosis", id))
    }

    async fn create_diagnosis(&self, draft: DiagnosisDraft) -> Result<Diagnosis, StoreError> {
        // The owning visit must live in this same partition.
        if !self.visit_exists(draft.visit_id).await? {
            return Err(StoreError::missing_parent("visit", draft.visit_id));
        }

        let diagnosis = sqlx::query_as::<_, Diagnosis>(
            "INSERT INTO diagnoses (visit_id, description) VALUES ($1, $2) \
             RETURNING id, visit_id, description",
        )
        .bind(draft.visit_id)
        .bind(&draft.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(diagnosis)
    }

    async fn update_diagnosis(&self, id: i64, diagnosis: Diagnosis) -> Result<(), StoreError> {
        if id != diagnosis.id {
            return Err(StoreError::IdMismatch {
                entity: "diagnosis",
                path: id,
                body: diagnosis.id,
            });
        }

        let result =
            sqlx::query("UPDATE diagnoses SET visit_id = $2, description = $3 WHERE id = $1")
                .bind(id)
                .bind(diagnosis.visit_id)
                .bind(&diagnosis.description)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("diagnosis", id));
        }
        Ok(())
    }

    async fn delete_diagnosis(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM diagnoses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("diagnosis", id));
        }
        Ok(())
    }

    async fn diagnosis_exists(&self, id: i64) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM diagnoses WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn prescriptions_for_diagnosis(
        &self,
        diagnosis_id: i64,
    ) -> Result<Vec<Prescription>, StoreError> {
        let prescriptions = sqlx::query_as::<_, Prescription>(
            "SELECT id, diagnosis_id, medication, instructions \
             FROM prescriptions WHERE diagnosis_id = $1 ORDER BY id",
        )
        .bind(diagnosis_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(prescriptions)
    }

    async fn get_prescription(&self, id: i64) -> Result<Prescription, StoreError> {
        sqlx::query_as::<_, Prescription>(
            "SELECT id, diagnosis_id, medication, instructions FROM prescriptions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::not_found("prescription", id))
    }

    async fn create_prescription(
        &self,
        draft: PrescriptionDraft,
    ) -> Result<Prescription, StoreError> {
        if !self.diagnosis_exists(draft.diagnosis_id).await? {
            return Err(StoreError::missing_parent("diagnosis", draft.diagnosis_id));
        }

        let prescription = sqlx::query_as::<_, Prescription>(
            "INSERT INTO prescriptions (diagnosis_id, medication, instructions) \
             VALUES ($1, $2, $3) \
             RETURNING id, diagnosis_id, medication, instructions",
        )
        .bind(draft.diagnosis_id)
        .bind(&draft.medication)
        .bind(draft.instructions())
        .fetch_one(&self.pool)
        .await?;
        Ok(prescription)
    }

    async fn update_prescription(
        &self,
        id: i64,
        prescription: Prescription,
    ) -> Result<(), StoreError> {
        if id != prescription.id {
            return Err(StoreError::IdMismatch {
                entity: "prescription",
                path: id,
                body: prescription.id,
            });
        }

        let result = sqlx::query(
            "UPDATE prescriptions \
             SET diagnosis_id = $2, medication = $3, instructions = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(prescription.diagnosis_id)
        .bind(&prescription.medication)
        .bind(&prescription.instructions)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("prescription", id));
        }
        Ok(())
    }

    async fn delete_prescription(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM prescriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("prescription", id));
        }
        Ok(())
    }

    /// Transactional override of the default ordered sequence: a
    /// mid-sequence failure rolls the whole cascade back, so a concurrent
    /// reader never observes a half-deleted visit.
    async fn delete_visit_cascade(&self, visit_id: i64) -> Result<CascadeOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM clinical_visits WHERE id = $1")
            .bind(visit_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found("visit", visit_id));
        }

        let prescriptions = sqlx::query(
            "DELETE FROM prescriptions WHERE diagnosis_id IN \
             (SELECT id FROM diagnoses WHERE visit_id = $1)",
        )
        .bind(visit_id)
        .execute(&mut *tx)
        .await?;

        let diagnoses = sqlx::query("DELETE FROM diagnoses WHERE visit_id = $1")
            .bind(visit_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM clinical_visits WHERE id = $1")
            .bind(visit_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CascadeOutcome {
            diagnoses: diagnoses.rows_affected(),
            prescriptions: prescriptions.rows_affected(),
        })
    }

    async fn delete_diagnosis_cascade(
        &self,
        diagnosis_id: i64,
    ) -> Result<CascadeOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM diagnoses WHERE id = $1")
            .bind(diagnosis_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found("diagnosis", diagnosis_id));
        }

        let prescriptions = sqlx::query("DELETE FROM prescriptions WHERE diagnosis_id = $1")
            .bind(diagnosis_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM diagnoses WHERE id = $1")
            .bind(diagnosis_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CascadeOutcome {
            diagnoses: 1,
            prescriptions: prescriptions.rows_affected(),
        })
    }
}

/// Resolves registry entries to Postgres-backed stores through the shared
/// pool cache.
pub struct PgStoreProvider;

impl PgStoreProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PgStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreProvider for PgStoreProvider {
    async fn partition(
        &self,
        target: &PartitionTarget,
    ) -> Result<Arc<dyn PartitionStore>, StoreError> {
        let pool = PoolManager::pool(&target.database).await?;
        Ok(Arc::new(PgPartitionStore::new(pool)))
    }
}
