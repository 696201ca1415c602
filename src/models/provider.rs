use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean_optional, require_text};
use crate::db::DatabaseError;

/// A clinician who sees patients at one clinic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub specialty: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInput {
    pub clinic_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ProviderInput {
    pub fn normalized(self) -> Result<Self, DatabaseError> {
        Ok(Self {
            clinic_id: self.clinic_id,
            name: require_text("name", &self.name)?,
            specialty: clean_optional(self.specialty),
            email: clean_optional(self.email),
            phone: clean_optional(self.phone),
        })
    }
}
