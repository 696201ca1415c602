//! `GET /api/visits/:id`: visit detail.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext};
use crate::db::repository;
use crate::models::Visit;

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Visit>, ApiError> {
    let id = parse_id("visit", &id)?;
    let conn = ctx.core.open_db()?;
    let visit = repository::get_visit(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("visit {id} not found")))?;
    Ok(Json(visit))
}
