use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{ensure_active_reference, uuid_at};
use crate::db::query::FilterQuery;
use crate::db::DatabaseError;
use crate::models::*;

const PROVIDER_COLUMNS: &str =
    "id, clinic_id, name, specialty, email, phone, created_at, updated_at, is_deleted, deleted_at";

fn provider_from_row(row: &Row<'_>) -> rusqlite::Result<Provider> {
    Ok(Provider {
        id: uuid_at(row, 0)?,
        clinic_id: uuid_at(row, 1)?,
        name: row.get(2)?,
        specialty: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        is_deleted: row.get(8)?,
        deleted_at: row.get(9)?,
    })
}

pub fn insert_provider(conn: &Connection, provider: &Provider) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO providers (id, clinic_id, name, specialty, email, phone, created_at,
         updated_at, is_deleted, deleted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            provider.id.to_string(),
            provider.clinic_id.to_string(),
            provider.name,
            provider.specialty,
            provider.email,
            provider.phone,
            provider.created_at,
            provider.updated_at,
            provider.is_deleted,
            provider.deleted_at,
        ],
    )?;
    Ok(())
}

pub fn create_provider(
    conn: &Connection,
    input: ProviderInput,
    now: NaiveDateTime,
) -> Result<Provider, DatabaseError> {
    let input = input.normalized()?;
    ensure_active_reference(conn, "clinics", "clinic", &input.clinic_id)?;

    let provider = Provider {
        id: Uuid::new_v4(),
        clinic_id: input.clinic_id,
        name: input.name,
        specialty: input.specialty,
        email: input.email,
        phone: input.phone,
        created_at: now,
        updated_at: now,
        is_deleted: false,
        deleted_at: None,
    };
    insert_provider(conn, &provider)?;
    tracing::info!(provider_id = %provider.id, clinic_id = %provider.clinic_id, "Provider created");
    Ok(provider)
}

pub fn get_provider(conn: &Connection, id: &Uuid) -> Result<Option<Provider>, DatabaseError> {
    let provider = conn
        .query_row(
            &format!("SELECT {PROVIDER_COLUMNS} FROM providers WHERE id = ?1"),
            params![id.to_string()],
            provider_from_row,
        )
        .optional()?;
    Ok(provider)
}

pub fn list_providers(
    conn: &Connection,
    filter: &ProviderFilter,
) -> Result<Vec<Provider>, DatabaseError> {
    let query = FilterQuery::new()
        .eq("clinic_id", filter.clinic_id.map(|id| id.to_string()))
        .any_like(&["specialty"], filter.specialty.as_deref())
        .not_deleted("is_deleted", filter.include_deleted);
    let sql = format!(
        "SELECT {PROVIDER_COLUMNS} FROM providers{} ORDER BY name ASC",
        query.where_clause()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(query.param_refs().as_slice(), provider_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_provider(
    conn: &Connection,
    id: &Uuid,
    input: ProviderInput,
    now: NaiveDateTime,
) -> Result<Provider, DatabaseError> {
    let input = input.normalized()?;
    ensure_active_reference(conn, "clinics", "clinic", &input.clinic_id)?;

    let changed = conn.execute(
        "UPDATE providers SET clinic_id = ?2, name = ?3, specialty = ?4, email = ?5, phone = ?6,
         updated_at = ?7
         WHERE id = ?1 AND is_deleted = 0",
        params![
            id.to_string(),
            input.clinic_id.to_string(),
            input.name,
            input.specialty,
            input.email,
            input.phone,
            now,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("provider", id));
    }
    get_provider(conn, id)?.ok_or_else(|| DatabaseError::not_found("provider", id))
}

/// Soft-delete a provider. Returns `false` if already deleted.
pub fn soft_delete_provider(
    conn: &Connection,
    id: &Uuid,
    now: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let provider =
        get_provider(conn, id)?.ok_or_else(|| DatabaseError::not_found("provider", id))?;
    if provider.is_deleted {
        return Ok(false);
    }
    conn.execute(
        "UPDATE providers SET is_deleted = 1, deleted_at = ?2, updated_at = ?2
         WHERE id = ?1 AND is_deleted = 0",
        params![id.to_string(), now],
    )?;
    tracing::info!(provider_id = %id, "Provider soft-deleted");
    Ok(true)
}
