use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{enum_at, opt_uuid_at, uuid_at};
use crate::db::query::FilterQuery;
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str = "id, clinic_id, patient_id, provider_id, visit_id, starts_at, \
     duration_minutes, status, reason, notes, created_at, last_modified, is_deleted, deleted_at";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: uuid_at(row, 0)?,
        clinic_id: uuid_at(row, 1)?,
        patient_id: uuid_at(row, 2)?,
        provider_id: opt_uuid_at(row, 3)?,
        visit_id: uuid_at(row, 4)?,
        starts_at: row.get(5)?,
        duration_minutes: row.get(6)?,
        status: enum_at(row, 7)?,
        reason: row.get(8)?,
        notes: row.get(9)?,
        created_at: row.get(10)?,
        last_modified: row.get(11)?,
        is_deleted: row.get(12)?,
        deleted_at: row.get(13)?,
    })
}

/// Insert or update an appointment row keyed by id.
///
/// On conflict every editable column is replaced and `last_modified` is
/// refreshed; `created_at` and the soft-delete columns are left alone.
pub fn upsert_appointment_row(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, clinic_id, patient_id, provider_id, visit_id, starts_at,
         duration_minutes, status, reason, notes, created_at, last_modified, is_deleted, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, NULL)
         ON CONFLICT(id) DO UPDATE SET
            clinic_id = excluded.clinic_id,
            patient_id = excluded.patient_id,
            provider_id = excluded.provider_id,
            visit_id = excluded.visit_id,
            starts_at = excluded.starts_at,
            duration_minutes = excluded.duration_minutes,
            status = excluded.status,
            reason = excluded.reason,
            notes = excluded.notes,
            last_modified = excluded.last_modified",
        params![
            appt.id.to_string(),
            appt.clinic_id.to_string(),
            appt.patient_id.to_string(),
            appt.provider_id.map(|id| id.to_string()),
            appt.visit_id.to_string(),
            appt.starts_at,
            appt.duration_minutes,
            appt.status.as_str(),
            appt.reason,
            appt.notes,
            appt.created_at,
            appt.last_modified,
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let appt = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            appointment_from_row,
        )
        .optional()?;
    Ok(appt)
}

/// List appointments matching `filter`, earliest first.
pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let query = FilterQuery::new()
        .eq("clinic_id", filter.clinic_id.map(|id| id.to_string()))
        .eq("patient_id", filter.patient_id.map(|id| id.to_string()))
        .eq("provider_id", filter.provider_id.map(|id| id.to_string()))
        .eq("status", filter.status.map(|s| s.as_str()))
        .gte("starts_at", filter.from)
        .lt("starts_at", filter.to)
        .not_deleted("is_deleted", filter.include_deleted);
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments{} ORDER BY starts_at ASC, id ASC",
        query.where_clause()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(query.param_refs().as_slice(), appointment_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Soft-delete an appointment. Returns `false` if already deleted.
pub fn soft_delete_appointment(
    conn: &Connection,
    id: &Uuid,
    now: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let appt =
        get_appointment(conn, id)?.ok_or_else(|| DatabaseError::not_found("appointment", id))?;
    if appt.is_deleted {
        return Ok(false);
    }
    conn.execute(
        "UPDATE appointments SET is_deleted = 1, deleted_at = ?2, last_modified = ?2
         WHERE id = ?1 AND is_deleted = 0",
        params![id.to_string(), now],
    )?;
    tracing::info!(appointment_id = %id, "Appointment soft-deleted");
    Ok(true)
}
