//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a `&Connection` so it can run either on a plain
//! connection or inside a transaction (`Transaction` derefs to `Connection`).

mod appointment;
mod clinic;
mod patient;
mod provider;
mod visit;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

use super::DatabaseError;

pub use appointment::*;
pub use clinic::*;
pub use patient::*;
pub use provider::*;
pub use visit::*;

/// Read a TEXT uuid column, failing the row instead of defaulting.
pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

/// Parse a `str_enum` column inside a row mapper.
pub(crate) fn enum_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = DatabaseError>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Begin a transaction that takes the write lock up front.
///
/// Check-then-write paths use this so a concurrent writer cannot commit
/// between the check and the write, and a WAL reader never has to upgrade
/// a stale snapshot (`SQLITE_BUSY_SNAPSHOT`).
pub(crate) fn immediate_transaction(
    conn: &Connection,
) -> Result<Transaction<'_>, DatabaseError> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

/// Check that a referenced row exists and is not soft-deleted.
///
/// `table` is always a compile-time table name with an `is_deleted` column.
pub(crate) fn ensure_active_reference(
    conn: &Connection,
    table: &'static str,
    label: &str,
    id: &Uuid,
) -> Result<(), DatabaseError> {
    let deleted: Option<bool> = conn
        .query_row(
            &format!("SELECT is_deleted FROM {table} WHERE id = ?1"),
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match deleted {
        None => Err(DatabaseError::Validation(format!("unknown {label} {id}"))),
        Some(true) => Err(DatabaseError::Validation(format!("{label} {id} is deleted"))),
        Some(false) => Ok(()),
    }
}
