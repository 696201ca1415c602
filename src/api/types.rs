//! Shared types for the API layer.

use std::sync::Arc;

use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Parse a path id, answering 400 instead of axum's plain-text rejection.
pub fn parse_id(kind: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid {kind} id: {raw}")))
}

/// Server clock used for every write (UTC, whole seconds).
pub fn now() -> NaiveDateTime {
    let now = chrono::Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Body returned by every soft-delete endpoint.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: Uuid,
    /// `true` when the row was already deleted before this call.
    pub already_deleted: bool,
}
