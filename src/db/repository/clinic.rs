use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{immediate_transaction, uuid_at};
use crate::db::query::FilterQuery;
use crate::db::DatabaseError;
use crate::models::*;

const CLINIC_COLUMNS: &str =
    "id, name, address, phone, timezone, created_at, updated_at, is_deleted, deleted_at";

fn clinic_from_row(row: &Row<'_>) -> rusqlite::Result<Clinic> {
    Ok(Clinic {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        phone: row.get(3)?,
        timezone: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        is_deleted: row.get(7)?,
        deleted_at: row.get(8)?,
    })
}

pub fn insert_clinic(conn: &Connection, clinic: &Clinic) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO clinics (id, name, address, phone, timezone, created_at, updated_at, is_deleted, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            clinic.id.to_string(),
            clinic.name,
            clinic.address,
            clinic.phone,
            clinic.timezone,
            clinic.created_at,
            clinic.updated_at,
            clinic.is_deleted,
            clinic.deleted_at,
        ],
    )?;
    Ok(())
}

pub fn create_clinic(
    conn: &Connection,
    input: ClinicInput,
    now: NaiveDateTime,
) -> Result<Clinic, DatabaseError> {
    let input = input.normalized()?;
    let clinic = Clinic {
        id: Uuid::new_v4(),
        name: input.name,
        address: input.address,
        phone: input.phone,
        timezone: input.timezone,
        created_at: now,
        updated_at: now,
        is_deleted: false,
        deleted_at: None,
    };
    insert_clinic(conn, &clinic)?;
    tracing::info!(clinic_id = %clinic.id, "Clinic created");
    Ok(clinic)
}

pub fn get_clinic(conn: &Connection, id: &Uuid) -> Result<Option<Clinic>, DatabaseError> {
    let clinic = conn
        .query_row(
            &format!("SELECT {CLINIC_COLUMNS} FROM clinics WHERE id = ?1"),
            params![id.to_string()],
            clinic_from_row,
        )
        .optional()?;
    Ok(clinic)
}

pub fn list_clinics(conn: &Connection, filter: &ClinicFilter) -> Result<Vec<Clinic>, DatabaseError> {
    let query = FilterQuery::new()
        .any_like(&["name"], filter.name.as_deref())
        .not_deleted("is_deleted", filter.include_deleted);
    let sql = format!(
        "SELECT {CLINIC_COLUMNS} FROM clinics{} ORDER BY name ASC",
        query.where_clause()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(query.param_refs().as_slice(), clinic_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Replace the editable fields of a live clinic.
pub fn update_clinic(
    conn: &Connection,
    id: &Uuid,
    input: ClinicInput,
    now: NaiveDateTime,
) -> Result<Clinic, DatabaseError> {
    let input = input.normalized()?;
    let changed = conn.execute(
        "UPDATE clinics SET name = ?2, address = ?3, phone = ?4, timezone = ?5, updated_at = ?6
         WHERE id = ?1 AND is_deleted = 0",
        params![
            id.to_string(),
            input.name,
            input.address,
            input.phone,
            input.timezone,
            now,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("clinic", id));
    }
    get_clinic(conn, id)?.ok_or_else(|| DatabaseError::not_found("clinic", id))
}

/// Number of live appointments booked at a clinic.
pub fn count_active_appointments_for_clinic(
    conn: &Connection,
    clinic_id: &Uuid,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE clinic_id = ?1 AND is_deleted = 0",
        params![clinic_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Soft-delete a clinic.
///
/// Refused while any live appointment still references the clinic.
/// Returns `false` when the clinic was already deleted; the original
/// `deleted_at` is kept in that case. The check and the flag update share
/// one write-locked transaction, so no booking can land in between.
pub fn soft_delete_clinic(
    conn: &Connection,
    id: &Uuid,
    now: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let tx = immediate_transaction(conn)?;

    let clinic = get_clinic(&tx, id)?.ok_or_else(|| DatabaseError::not_found("clinic", id))?;
    if clinic.is_deleted {
        return Ok(false);
    }

    let in_use = count_active_appointments_for_clinic(&tx, id)?;
    if in_use > 0 {
        tracing::warn!(clinic_id = %id, in_use, "Clinic delete refused: appointments reference it");
        return Err(DatabaseError::ConstraintViolation(format!(
            "clinic {id} is referenced by {in_use} appointment(s)"
        )));
    }

    tx.execute(
        "UPDATE clinics SET is_deleted = 1, deleted_at = ?2, updated_at = ?2
         WHERE id = ?1 AND is_deleted = 0",
        params![id.to_string(), now],
    )?;
    tx.commit()?;
    tracing::info!(clinic_id = %id, "Clinic soft-deleted");
    Ok(true)
}
