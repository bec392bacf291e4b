#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use medcenter_api::auth::{generate_jwt, Claims, Role};
use medcenter_api::catalog::{CatalogDirectory, CatalogError};
use medcenter_api::models::{
    ClinicalVisit, Diagnosis, DiagnosisDraft, Prescription, PrescriptionDraft, VisitDraft,
};
use medcenter_api::registry::{PartitionRegistry, PartitionTarget};
use medcenter_api::server::AppState;
use medcenter_api::store::{PartitionStore, StoreError, StoreProvider};

/// The test suite signs its own tokens; the secret must be in place before
/// the config singleton is first touched.
pub fn init_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        std::env::set_var("JWT_SECRET", "integration-test-secret");
    });
}

pub fn bearer(user: &str, site: i64, roles: &[Role]) -> String {
    init_env();
    let claims = Claims::new(user.to_string(), uuid::Uuid::new_v4(), site, roles);
    format!("Bearer {}", generate_jwt(&claims).expect("sign test token"))
}

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

pub fn draft(patient_id: i64, doctor_id: i64, reason: &str, at: DateTime<Utc>) -> VisitDraft {
    VisitDraft {
        patient_id,
        doctor_id,
        reason: Some(reason.to_string()),
        occurred_at: Some(at),
    }
}

// ---------------------------------------------------------------------------
// In-memory partition store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    visits: BTreeMap<i64, ClinicalVisit>,
    diagnoses: BTreeMap<i64, Diagnosis>,
    prescriptions: BTreeMap<i64, Prescription>,
    next_id: i64,
}

impl MemoryInner {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Partition store backed by in-process maps. Cascades go through the
/// trait's default ordered sequence, which is exactly what the cascade
/// tests want to observe.
#[derive(Default)]
pub struct MemoryPartition {
    inner: Mutex<MemoryInner>,
}

impl MemoryPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a visit directly, bypassing catalog validation.
    pub async fn seed_visit(&self, draft: VisitDraft) -> ClinicalVisit {
        self.create_visit(draft).await.expect("seed visit")
    }

    pub fn record_counts(&self) -> (usize, usize, usize) {
        let inner = self.inner.lock().unwrap();
        (
            inner.visits.len(),
            inner.diagnoses.len(),
            inner.prescriptions.len(),
        )
    }
}

#[async_trait]
impl PartitionStore for MemoryPartition {
    async fn list_visits(&self) -> Result<Vec<ClinicalVisit>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut visits: Vec<_> = inner.visits.values().cloned().collect();
        visits.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(visits)
    }

    async fn get_visit(&self, id: i64) -> Result<ClinicalVisit, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .visits
            .get(&id)
            .cloned()
            .ok_or(StoreError::not_found("visit", id))
    }

    async fn create_visit(&self, draft: VisitDraft) -> Result<ClinicalVisit, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.assign_id();
        let visit = ClinicalVisit {
            id,
            patient_id: draft.patient_id,
            doctor_id: draft.doctor_id,
            reason: draft.reason(),
            occurred_at: draft.occurred_at(),
        };
        inner.visits.insert(id, visit.clone());
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
        let mut inner = self.inner.lock().unwrap();
        if !inner.visits.contains_key(&id) {
            return Err(StoreError::not_found("visit", id));
        }
        inner.visits.insert(id, visit);
        Ok(())
    }

    async fn delete_visit(&self, id: i64) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .visits
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::not_found("visit", id))
    }

    async fn visit_exists(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.lock().unwrap().visits.contains_key(&id))
    }

    async fn list_diagnoses(&self) -> Result<Vec<Diagnosis>, StoreError> {
        Ok(self.inner.lock().unwrap().diagnoses.values().cloned().collect())
    }

    async fn diagnoses_for_visit(&self, visit_id: i64) -> Result<Vec<Diagnosis>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .diagnoses
            .values()
            .filter(|d| d.visit_id == visit_id)
            .cloned()
            .collect())
    }

    async fn get_diagnosis(&self, id: i64) -> Result<Diagnosis, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .diagnoses
            .get(&id)
            .cloned()
            .ok_or(StoreError::not_found("diagnosis", id))
    }

    async fn create_diagnosis(&self, draft: DiagnosisDraft) -> Result<Diagnosis, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.visits.contains_key(&draft.visit_id) {
            return Err(StoreError::missing_parent("visit", draft.visit_id));
        }
        let id = inner.assign_id();
        let diagnosis = Diagnosis {
            id,
            visit_id: draft.visit_id,
            description: draft.description,
        };
        inner.diagnoses.insert(id, diagnosis.clone());
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
        let mut inner = self.inner.lock().unwrap();
        if !inner.diagnoses.contains_key(&id) {
            return Err(StoreError::not_found("diagnosis", id));
        }
        inner.diagnoses.insert(id, diagnosis);
        Ok(())
    }

    async fn delete_diagnosis(&self, id: i64) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .diagnoses
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::not_found("diagnosis", id))
    }

    async fn diagnosis_exists(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.lock().unwrap().diagnoses.contains_key(&id))
    }

    async fn prescriptions_for_diagnosis(
        &self,
        diagnosis_id: i64,
    ) -> Result<Vec<Prescription>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .prescriptions
            .values()
            .filter(|p| p.diagnosis_id == diagnosis_id)
            .cloned()
            .collect())
    }

    async fn get_prescription(&self, id: i64) -> Result<Prescription, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .prescriptions
            .get(&id)
            .cloned()
            .ok_or(StoreError::not_found("prescription", id))
    }

    async fn create_prescription(
        &self,
        draft: PrescriptionDraft,
    ) -> Result<Prescription, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.diagnoses.contains_key(&draft.diagnosis_id) {
            return Err(StoreError::missing_parent("diagnosis", draft.diagnosis_id));
        }
        let id = inner.assign_id();
        let instructions = draft.instructions();
        let prescription = Prescription {
            id,
            diagnosis_id: draft.diagnosis_id,
            medication: draft.medication,
            instructions,
        };
        inner.prescriptions.insert(id, prescription.clone());
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
        let mut inner = self.inner.lock().unwrap();
        if !inner.prescriptions.contains_key(&id) {
            return Err(StoreError::not_found("prescription", id));
        }
        inner.prescriptions.insert(id, prescription);
        Ok(())
    }

    async fn delete_prescription(&self, id: i64) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .prescriptions
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::not_found("prescription", id))
    }
}

// ---------------------------------------------------------------------------
// Failure-injecting partition store
// ---------------------------------------------------------------------------

/// A partition that errors on every operation, optionally after a delay
/// (to exercise the fan-out timeout).
#[derive(Default)]
pub struct UnreliablePartition {
    pub delay: Option<Duration>,
}

impl UnreliablePartition {
    pub fn failing() -> Self {
        Self { delay: None }
    }

    pub fn stalling(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }

    async fn trip<T>(&self) -> Result<T, StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Err(StoreError::Unavailable("injected failure".to_string()))
    }
}

#[async_trait]
impl PartitionStore for UnreliablePartition {
    async fn list_visits(&self) -> Result<Vec<ClinicalVisit>, StoreError> {
        self.trip().await
    }

    async fn get_visit(&self, _id: i64) -> Result<ClinicalVisit, StoreError> {
        self.trip().await
    }

    async fn create_visit(&self, _draft: VisitDraft) -> Result<ClinicalVisit, StoreError> {
        self.trip().await
    }

    async fn update_visit(&self, _id: i64, _visit: ClinicalVisit) -> Result<(), StoreError> {
        self.trip().await
    }

    async fn delete_visit(&self, _id: i64) -> Result<(), StoreError> {
        self.trip().await
    }

    async fn visit_exists(&self, _id: i64) -> Result<bool, StoreError> {
        self.trip().await
    }

    async fn list_diagnoses(&self) -> Result<Vec<Diagnosis>, StoreError> {
        self.trip().await
    }

    async fn diagnoses_for_visit(&self, _visit_id: i64) -> Result<Vec<Diagnosis>, StoreError> {
        self.trip().await
    }

    async fn get_diagnosis(&self, _id: i64) -> Result<Diagnosis, StoreError> {
        self.trip().await
    }

    async fn create_diagnosis(&self, _draft: DiagnosisDraft) -> Result<Diagnosis, StoreError> {
        self.trip().await
    }

    async fn update_diagnosis(&self, _id: i64, _diagnosis: Diagnosis) -> Result<(), StoreError> {
        self.trip().await
    }

    async fn delete_diagnosis(&self, _id: i64) -> Result<(), StoreError> {
        self.trip().await
    }

    async fn diagnosis_exists(&self, _id: i64) -> Result<bool, StoreError> {
        self.trip().await
    }

    async fn prescriptions_for_diagnosis(
        &self,
        _diagnosis_id: i64,
    ) -> Result<Vec<Prescription>, StoreError> {
        self.trip().await
    }

    async fn get_prescription(&self, _id: i64) -> Result<Prescription, StoreError> {
        self.trip().await
    }

    async fn create_prescription(
        &self,
        _draft: PrescriptionDraft,
    ) -> Result<Prescription, StoreError> {
        self.trip().await
    }

    async fn update_prescription(
        &self,
        _id: i64,
        _prescription: Prescription,
    ) -> Result<(), StoreError> {
        self.trip().await
    }

    async fn delete_prescription(&self, _id: i64) -> Result<(), StoreError> {
        self.trip().await
    }
}

// ---------------------------------------------------------------------------
// Provider + catalog fakes
// ---------------------------------------------------------------------------

/// Store provider backed by a fixed tenant-id map.
#[derive(Default)]
pub struct MapProvider {
    partitions: HashMap<i64, Arc<dyn PartitionStore>>,
}

impl MapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tenant_id: i64, store: Arc<dyn PartitionStore>) -> Self {
        self.partitions.insert(tenant_id, store);
        self
    }
}

#[async_trait]
impl StoreProvider for MapProvider {
    async fn partition(
        &self,
        target: &PartitionTarget,
    ) -> Result<Arc<dyn PartitionStore>, StoreError> {
        self.partitions
            .get(&target.tenant_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::Unavailable(format!("no backend for tenant {}", target.tenant_id))
            })
    }
}

pub struct MemoryCatalog {
    patients: HashSet<i64>,
    doctors: HashSet<i64>,
}

impl MemoryCatalog {
    pub fn new(patients: &[i64], doctors: &[i64]) -> Self {
        Self {
            patients: patients.iter().copied().collect(),
            doctors: doctors.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl CatalogDirectory for MemoryCatalog {
    async fn patient_exists(&self, id: i64) -> Result<bool, CatalogError> {
        Ok(self.patients.contains(&id))
    }

    async fn doctor_exists(&self, id: i64) -> Result<bool, CatalogError> {
        Ok(self.doctors.contains(&id))
    }
}

// ---------------------------------------------------------------------------
// Registry and state builders
// ---------------------------------------------------------------------------

pub fn site(tenant_id: i64, name: &str, aggregation_root: bool) -> PartitionTarget {
    PartitionTarget {
        tenant_id,
        name: name.to_string(),
        database: format!("medcenter_{}", name),
        aggregation_root,
    }
}

/// Three-site registry mirroring the default deployment: tenant 1 is the
/// aggregation root, tenants 2 and 3 are remote.
pub fn registry() -> Arc<PartitionRegistry> {
    Arc::new(
        PartitionRegistry::from_entries(vec![
            site(1, "central", true),
            site(2, "north", false),
            site(3, "south", false),
        ])
        .unwrap(),
    )
}

pub fn state(provider: MapProvider, catalog: MemoryCatalog, timeout: Duration) -> AppState {
    init_env();
    AppState::new(
        registry(),
        Arc::new(provider),
        Arc::new(catalog),
        timeout,
    )
}
