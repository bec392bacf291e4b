//! Clinical record rows and create drafts. Identifiers are assigned by the
//! owning partition and are unique only within it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Root clinical record. Patient and doctor ids reference the global
/// catalog; both are validated once at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClinicalVisit {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Write payload for a new visit. `occurred_at` defaults to now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitDraft {
    pub patient_id: i64,
    pub doctor_id: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl VisitDraft {
    pub fn reason(&self) -> String {
        self.reason.clone().unwrap_or_default()
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at.unwrap_or_else(Utc::now)
    }
}

/// Child of a visit; `visit_id` must resolve inside the same partition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Diagnosis {
    pub id: i64,
    pub visit_id: i64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisDraft {
    pub visit_id: i64,
    pub description: String,
}

/// Grandchild record; leaf of the cascade.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Prescription {
    pub id: i64,
    pub diagnosis_id: i64,
    pub medication: String,
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionDraft {
    pub diagnosis_id: i64,
    pub medication: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl PrescriptionDraft {
    pub fn instructions(&self) -> String {
        self.instructions.clone().unwrap_or_default()
    }
}
