//! Delta sync between the server of record and offline clients.
//!
//! Clients queue appointment mutations locally as deltas and push them on
//! their next sync. Each delta is replayed through the same write path as a
//! direct API call (`appointment::save_appointment` / `delete_appointment`);
//! there is no conflict resolution beyond the row upsert itself.
//!
//! Pull side: every entity table has a monotonic version counter bumped by
//! triggers. The client sends the versions it last saw, the server returns
//! the full collection of each entity type whose counter differs.

use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::appointment::{self, SavedAppointment};
use crate::db::repository::{immediate_transaction, list_all_visits, list_appointments, list_clinics, list_patients, list_providers};
use crate::db::DatabaseError;
use crate::models::*;

// ═══════════════════════════════════════════════════════════════════════════
// Sync Version Types
// ═══════════════════════════════════════════════════════════════════════════

/// Version counters for all synced entity types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncVersions {
    #[serde(default)]
    pub clinics: i64,
    #[serde(default)]
    pub patients: i64,
    #[serde(default)]
    pub providers: i64,
    #[serde(default)]
    pub visits: i64,
    #[serde(default)]
    pub appointments: i64,
}

impl SyncVersions {
    pub fn get(&self, kind: EntityKind) -> i64 {
        match kind {
            EntityKind::Clinics => self.clinics,
            EntityKind::Patients => self.patients,
            EntityKind::Providers => self.providers,
            EntityKind::Visits => self.visits,
            EntityKind::Appointments => self.appointments,
        }
    }

    fn set(&mut self, kind: EntityKind, version: i64) {
        match kind {
            EntityKind::Clinics => self.clinics = version,
            EntityKind::Patients => self.patients = version,
            EntityKind::Providers => self.providers = version,
            EntityKind::Visits => self.visits = version,
            EntityKind::Appointments => self.appointments = version,
        }
    }
}

pub const ALL_KINDS: [EntityKind; 5] = [
    EntityKind::Clinics,
    EntityKind::Patients,
    EntityKind::Providers,
    EntityKind::Visits,
    EntityKind::Appointments,
];

// ═══════════════════════════════════════════════════════════════════════════
// Delta Types (client → server)
// ═══════════════════════════════════════════════════════════════════════════

/// One queued client mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AppointmentDelta {
    Upsert { appointment: AppointmentInput },
    Delete { id: Uuid },
}

impl AppointmentDelta {
    pub fn op(&self) -> DeltaOp {
        match self {
            AppointmentDelta::Upsert { .. } => DeltaOp::Upsert,
            AppointmentDelta::Delete { .. } => DeltaOp::Delete,
        }
    }

    pub fn target_id(&self) -> Option<Uuid> {
        match self {
            AppointmentDelta::Upsert { appointment } => appointment.id,
            AppointmentDelta::Delete { id } => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaOp {
    Upsert,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedDelta {
    pub index: usize,
    pub id: Uuid,
    pub op: DeltaOp,
    /// Upserts only: a new visit was opened for the appointment.
    pub visit_created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDelta {
    pub index: usize,
    pub id: Option<Uuid>,
    pub op: DeltaOp,
    pub reason: String,
}

/// Outcome of replaying a batch of deltas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeltaResult {
    pub applied: Vec<AppliedDelta>,
    pub skipped: Vec<SkippedDelta>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Request / Response
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub versions: SyncVersions,
    #[serde(default)]
    pub deltas: Vec<AppointmentDelta>,
}

/// Sync response. Collections are `None` when that entity type is unchanged.
///
/// Collections include soft-deleted rows so clients can drop them locally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinics: Option<Vec<Clinic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patients: Option<Vec<Patient>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<Provider>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visits: Option<Vec<Visit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointments: Option<Vec<Appointment>>,
    pub versions: SyncVersions,
    pub synced_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deltas: Option<DeltaResult>,
}

impl SyncResponse {
    /// Entity types carried by this response, for logging.
    pub fn sent_kinds(&self) -> Vec<&'static str> {
        let mut sent = Vec::new();
        if self.clinics.is_some() {
            sent.push(EntityKind::Clinics.as_str());
        }
        if self.patients.is_some() {
            sent.push(EntityKind::Patients.as_str());
        }
        if self.providers.is_some() {
            sent.push(EntityKind::Providers.as_str());
        }
        if self.visits.is_some() {
            sent.push(EntityKind::Visits.as_str());
        }
        if self.appointments.is_some() {
            sent.push(EntityKind::Appointments.as_str());
        }
        sent
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Delta Application
// ═══════════════════════════════════════════════════════════════════════════

/// Apply an upsert delta through the regular booking path.
pub fn upsert_from_delta(
    conn: &Connection,
    appointment: AppointmentInput,
    now: NaiveDateTime,
) -> Result<SavedAppointment, DatabaseError> {
    appointment::save_appointment(conn, appointment, now)
}

/// Apply a delete delta through the regular soft-delete path.
pub fn delete_from_delta(
    conn: &Connection,
    id: &Uuid,
    now: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    appointment::delete_appointment(conn, id, now)
}

/// Replay deltas in order. Each one commits or fails on its own; a failure
/// is recorded in `skipped` and does not stop the rest of the batch.
pub fn apply_deltas(
    conn: &Connection,
    deltas: &[AppointmentDelta],
    now: NaiveDateTime,
) -> DeltaResult {
    let mut result = DeltaResult::default();

    for (index, delta) in deltas.iter().enumerate() {
        let op = delta.op();
        let outcome = match delta {
            AppointmentDelta::Upsert { appointment } => {
                upsert_from_delta(conn, appointment.clone(), now).map(|saved| {
                    (saved.appointment.id, saved.visit_created)
                })
            }
            AppointmentDelta::Delete { id } => delete_from_delta(conn, id, now).map(|_| (*id, false)),
        };

        match outcome {
            Ok((id, visit_created)) => result.applied.push(AppliedDelta {
                index,
                id,
                op,
                visit_created,
            }),
            Err(e) => {
                tracing::warn!(index, ?op, error = %e, "Delta skipped");
                result.skipped.push(SkippedDelta {
                    index,
                    id: delta.target_id(),
                    op,
                    reason: e.to_string(),
                });
            }
        }
    }

    result
}

// ═══════════════════════════════════════════════════════════════════════════
// Version Counter Functions
// ═══════════════════════════════════════════════════════════════════════════

/// Get current sync versions from the database.
pub fn get_sync_versions(conn: &Connection) -> Result<SyncVersions, DatabaseError> {
    let mut versions = SyncVersions::default();

    let mut stmt = conn.prepare("SELECT entity_type, version FROM sync_versions")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    for row in rows {
        let (entity_type, version) = row?;
        match EntityKind::from_str(&entity_type) {
            Ok(kind) => versions.set(kind, version),
            Err(_) => tracing::debug!(entity_type, "Ignoring unknown sync counter"),
        }
    }

    Ok(versions)
}

/// Force a full resync on every client's next pull.
///
/// Counters never move backwards: all of them jump to one past the highest
/// current value, so no version a client has seen (including the all-zero
/// state of a fresh client) matches any counter afterwards.
pub fn reset_sync_versions(conn: &Connection) -> Result<i64, DatabaseError> {
    let tx = immediate_transaction(conn)?;
    let floor: i64 = tx.query_row(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM sync_versions",
        [],
        |row| row.get(0),
    )?;
    tx.execute("UPDATE sync_versions SET version = ?1", [floor])?;
    tx.commit()?;
    tracing::info!(floor, "Sync versions advanced, next client sync will be full");
    Ok(floor)
}

/// Entity types whose client version differs from the server's.
///
/// A client ahead of the server (e.g. one that synced against another
/// database file) also counts as changed.
pub fn diff_versions(client: &SyncVersions, server: &SyncVersions) -> Vec<EntityKind> {
    ALL_KINDS
        .into_iter()
        .filter(|kind| client.get(*kind) != server.get(*kind))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Response Assembly
// ═══════════════════════════════════════════════════════════════════════════

/// Apply pushed deltas, then assemble everything the client is missing.
///
/// Returns `None` when no deltas were pushed and nothing changed (the
/// caller answers 204).
pub fn build_sync_response(
    conn: &Connection,
    request: &SyncRequest,
    now: NaiveDateTime,
) -> Result<Option<SyncResponse>, DatabaseError> {
    let deltas = if request.deltas.is_empty() {
        None
    } else {
        Some(apply_deltas(conn, &request.deltas, now))
    };

    let current = get_sync_versions(conn)?;
    let changed = diff_versions(&request.versions, &current);

    if changed.is_empty() && deltas.is_none() {
        return Ok(None);
    }

    let mut response = SyncResponse {
        versions: current,
        synced_at: now.and_utc().to_rfc3339(),
        deltas,
        ..Default::default()
    };

    for kind in changed {
        match kind {
            EntityKind::Clinics => {
                let filter = ClinicFilter {
                    include_deleted: true,
                    ..Default::default()
                };
                response.clinics = Some(list_clinics(conn, &filter)?);
            }
            EntityKind::Patients => {
                let filter = PatientFilter {
                    include_deleted: true,
                    ..Default::default()
                };
                response.patients = Some(list_patients(conn, &filter)?);
            }
            EntityKind::Providers => {
                let filter = ProviderFilter {
                    include_deleted: true,
                    ..Default::default()
                };
                response.providers = Some(list_providers(conn, &filter)?);
            }
            EntityKind::Visits => {
                response.visits = Some(list_all_visits(conn)?);
            }
            EntityKind::Appointments => {
                let filter = AppointmentFilter {
                    include_deleted: true,
                    ..Default::default()
                };
                response.appointments = Some(list_appointments(conn, &filter)?);
            }
        }
    }

    Ok(Some(response))
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
