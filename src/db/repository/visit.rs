use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{opt_uuid_at, uuid_at};
use crate::db::DatabaseError;
use crate::models::*;

const VISIT_COLUMNS: &str =
    "id, clinic_id, patient_id, provider_id, visit_date, reason, created_at";

fn visit_from_row(row: &Row<'_>) -> rusqlite::Result<Visit> {
    Ok(Visit {
        id: uuid_at(row, 0)?,
        clinic_id: uuid_at(row, 1)?,
        patient_id: uuid_at(row, 2)?,
        provider_id: opt_uuid_at(row, 3)?,
        visit_date: row.get(4)?,
        reason: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_visit(conn: &Connection, visit: &Visit) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO visits (id, clinic_id, patient_id, provider_id, visit_date, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            visit.id.to_string(),
            visit.clinic_id.to_string(),
            visit.patient_id.to_string(),
            visit.provider_id.map(|id| id.to_string()),
            visit.visit_date,
            visit.reason,
            visit.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_visit(conn: &Connection, id: &Uuid) -> Result<Option<Visit>, DatabaseError> {
    let visit = conn
        .query_row(
            &format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = ?1"),
            params![id.to_string()],
            visit_from_row,
        )
        .optional()?;
    Ok(visit)
}

/// Resolve a client-supplied visit identifier.
///
/// Returns `None` for blank, non-UUID, or unknown identifiers.
pub fn find_visit_by_raw_id(
    conn: &Connection,
    raw: Option<&str>,
) -> Result<Option<Visit>, DatabaseError> {
    let id = match raw.map(str::trim).and_then(|r| Uuid::parse_str(r).ok()) {
        Some(id) => id,
        None => return Ok(None),
    };
    get_visit(conn, &id)
}

pub fn list_visits_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Visit>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VISIT_COLUMNS} FROM visits WHERE patient_id = ?1
         ORDER BY visit_date DESC, created_at DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], visit_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn list_all_visits(conn: &Connection) -> Result<Vec<Visit>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VISIT_COLUMNS} FROM visits ORDER BY visit_date DESC, created_at DESC"
    ))?;
    let rows = stmt.query_map([], visit_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
