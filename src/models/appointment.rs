use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub visit_id: Uuid,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_modified: NaiveDateTime,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
}

/// Appointment as submitted by a client, directly or through a sync delta.
///
/// `visit_id` stays a raw string: anything that does not name an existing
/// visit causes a new visit to be opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    #[serde(default)]
    pub provider_id: Option<Uuid>,
    #[serde(default)]
    pub visit_id: Option<String>,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
