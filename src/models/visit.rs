use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One patient encounter; appointments hang off a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub visit_date: NaiveDate,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}
