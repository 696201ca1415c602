use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{ensure_active_reference, opt_uuid_at, uuid_at};
use crate::db::query::FilterQuery;
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, first_name, last_name, date_of_birth, phone, email, \
     primary_clinic_id, notes, created_at, updated_at, is_deleted, deleted_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: uuid_at(row, 0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        primary_clinic_id: opt_uuid_at(row, 6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        is_deleted: row.get(10)?,
        deleted_at: row.get(11)?,
    })
}

fn check_primary_clinic(conn: &Connection, input: &PatientInput) -> Result<(), DatabaseError> {
    match input.primary_clinic_id {
        Some(ref clinic_id) => ensure_active_reference(conn, "clinics", "clinic", clinic_id),
        None => Ok(()),
    }
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, date_of_birth, phone, email,
         primary_clinic_id, notes, created_at, updated_at, is_deleted, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.date_of_birth,
            patient.phone,
            patient.email,
            patient.primary_clinic_id.map(|id| id.to_string()),
            patient.notes,
            patient.created_at,
            patient.updated_at,
            patient.is_deleted,
            patient.deleted_at,
        ],
    )?;
    Ok(())
}

pub fn create_patient(
    conn: &Connection,
    input: PatientInput,
    now: NaiveDateTime,
) -> Result<Patient, DatabaseError> {
    let input = input.normalized()?;
    check_primary_clinic(conn, &input)?;

    let patient = Patient {
        id: Uuid::new_v4(),
        first_name: input.first_name,
        last_name: input.last_name,
        date_of_birth: input.date_of_birth,
        phone: input.phone,
        email: input.email,
        primary_clinic_id: input.primary_clinic_id,
        notes: input.notes,
        created_at: now,
        updated_at: now,
        is_deleted: false,
        deleted_at: None,
    };
    insert_patient(conn, &patient)?;
    tracing::info!(patient_id = %patient.id, "Patient created");
    Ok(patient)
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id.to_string()],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

pub fn list_patients(
    conn: &Connection,
    filter: &PatientFilter,
) -> Result<Vec<Patient>, DatabaseError> {
    let query = FilterQuery::new()
        .any_like(&["first_name", "last_name"], filter.q.as_deref())
        .eq("primary_clinic_id", filter.clinic_id.map(|id| id.to_string()))
        .not_deleted("is_deleted", filter.include_deleted);
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients{} ORDER BY last_name ASC, first_name ASC",
        query.where_clause()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(query.param_refs().as_slice(), patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_patient(
    conn: &Connection,
    id: &Uuid,
    input: PatientInput,
    now: NaiveDateTime,
) -> Result<Patient, DatabaseError> {
    let input = input.normalized()?;
    check_primary_clinic(conn, &input)?;

    let changed = conn.execute(
        "UPDATE patients SET first_name = ?2, last_name = ?3, date_of_birth = ?4, phone = ?5,
         email = ?6, primary_clinic_id = ?7, notes = ?8, updated_at = ?9
         WHERE id = ?1 AND is_deleted = 0",
        params![
            id.to_string(),
            input.first_name,
            input.last_name,
            input.date_of_birth,
            input.phone,
            input.email,
            input.primary_clinic_id.map(|c| c.to_string()),
            input.notes,
            now,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("patient", id));
    }
    get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("patient", id))
}

/// Soft-delete a patient. Returns `false` if already deleted.
pub fn soft_delete_patient(
    conn: &Connection,
    id: &Uuid,
    now: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let patient = get_patient(conn, id)?.ok_or_else(|| DatabaseError::not_found("patient", id))?;
    if patient.is_deleted {
        return Ok(false);
    }
    conn.execute(
        "UPDATE patients SET is_deleted = 1, deleted_at = ?2, updated_at = ?2
         WHERE id = ?1 AND is_deleted = 0",
        params![id.to_string(), now],
    )?;
    tracing::info!(patient_id = %id, "Patient soft-deleted");
    Ok(true)
}
