use chrono::NaiveDateTime;
use serde::Deserialize;
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Default, Deserialize)]
pub struct ClinicFilter {
    pub name: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientFilter {
    /// Substring of first or last name.
    pub q: Option<String>,
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProviderFilter {
    pub clinic_id: Option<Uuid>,
    pub specialty: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentFilter {
    pub clinic_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    /// Inclusive lower bound on `starts_at`.
    pub from: Option<NaiveDateTime>,
    /// Exclusive upper bound on `starts_at`.
    pub to: Option<NaiveDateTime>,
    #[serde(default)]
    pub include_deleted: bool,
}
