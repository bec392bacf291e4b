//! Ordered deletion of a clinical record together with its dependents,
//! within one partition. Grandchildren go first, then children, then the
//! parent, so referential constraints are never violated mid-sequence.
//!
//! These routines are built from the primitive store operations and are not
//! atomic on their own; a mid-sequence failure leaves already-deleted
//! children deleted. The Postgres adapter overrides both cascades with a
//! single-transaction equivalent.

use crate::store::{PartitionStore, StoreError};

/// How many dependent rows a cascade removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub diagnoses: u64,
    pub prescriptions: u64,
}

/// Delete a visit and every diagnosis/prescription depending on it.
/// Fails with `NotFound` before deleting anything if the visit is absent.
pub async fn delete_visit_tree<S>(store: &S, visit_id: i64) -> Result<CascadeOutcome, StoreError>
where
    S: PartitionStore + ?Sized,
{
    let visit = store.get_visit(visit_id).await?;
    let diagnoses = store.diagnoses_for_visit(visit.id).await?;

    let mut outcome = CascadeOutcome::default();
    for diagnosis in &diagnoses {
        for prescription in store.prescriptions_for_diagnosis(diagnosis.id).await? {
            store.delete_prescription(prescription.id).await?;
            outcome.prescriptions += 1;
        }
    }
    for diagnosis in &diagnoses {
        store.delete_diagnosis(diagnosis.id).await?;
        outcome.diagnoses += 1;
    }
    store.delete_visit(visit.id).await?;

    Ok(outcome)
}

/// Delete a diagnosis and its prescriptions.
pub async fn delete_diagnosis_tree<S>(
    store: &S,
    diagnosis_id: i64,
) -> Result<CascadeOutcome, StoreError>
where
    S: PartitionStore + ?Sized,
{
    let diagnosis = store.get_diagnosis(diagnosis_id).await?;

    let mut outcome = CascadeOutcome::default();
    for prescription in store.prescriptions_for_diagnosis(diagnosis.id).await? {
        store.delete_prescription(prescription.id).await?;
        outcome.prescriptions += 1;
    }
    store.delete_diagnosis(diagnosis.id).await?;
    outcome.diagnoses = 1;

    Ok(outcome)
}
