use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::db::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub primary_clinic_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub primary_clinic_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PatientInput {
    /// Trim fields and reject blank names or an obviously malformed email.
    pub fn normalized(self) -> Result<Self, DatabaseError> {
        let email = clean_optional(self.email);
        if let Some(ref e) = email {
            if !e.contains('@') {
                return Err(DatabaseError::Validation(format!("invalid email: {e}")));
            }
        }
        Ok(Self {
            first_name: require_text("first_name", &self.first_name)?,
            last_name: require_text("last_name", &self.last_name)?,
            date_of_birth: self.date_of_birth,
            phone: clean_optional(self.phone),
            email,
            primary_clinic_id: self.primary_clinic_id,
            notes: clean_optional(self.notes),
        })
    }
}
