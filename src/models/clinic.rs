use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::db::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
}

/// Editable clinic fields, used for both create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicInput {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl ClinicInput {
    pub fn normalized(self) -> Result<Self, DatabaseError> {
        Ok(Self {
            name: require_text("name", &self.name)?,
            address: clean_optional(self.address),
            phone: clean_optional(self.phone),
            timezone: clean_optional(self.timezone),
        })
    }
}
