pub mod appointment;
pub mod clinic;
pub mod enums;
pub mod filters;
pub mod patient;
pub mod provider;
pub mod visit;

pub use appointment::*;
pub use clinic::*;
pub use enums::*;
pub use filters::*;
pub use patient::*;
pub use provider::*;
pub use visit::*;

use crate::db::DatabaseError;

/// Trim an optional text field, collapsing blank strings to `None`.
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim a required text field, rejecting blank values.
pub(crate) fn require_text(field: &str, value: &str) -> Result<String, DatabaseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DatabaseError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
