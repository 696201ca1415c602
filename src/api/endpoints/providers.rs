//! Provider endpoints.
//!
//! - `GET /api/providers`: list (`?clinic_id=`, `?specialty=`, `?include_deleted=`)
//! - `POST /api/providers`: create
//! - `GET|PUT|DELETE /api/providers/:id`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{now, parse_id, ApiContext, DeleteResponse};
use crate::db::repository;
use crate::models::{Provider, ProviderFilter, ProviderInput};

#[derive(Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<Provider>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<ProviderFilter>, QueryRejection>,
) -> Result<Json<ProvidersResponse>, ApiError> {
    let Query(filter) = query?;
    let conn = ctx.core.open_db()?;
    let providers = repository::list_providers(&conn, &filter)?;
    Ok(Json(ProvidersResponse { providers }))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    body: Result<Json<ProviderInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Provider>), ApiError> {
    let Json(input) = body?;
    let conn = ctx.core.open_db()?;
    let provider = repository::create_provider(&conn, input, now())?;
    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Provider>, ApiError> {
    let id = parse_id("provider", &id)?;
    let conn = ctx.core.open_db()?;
    let provider = repository::get_provider(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("provider {id} not found")))?;
    Ok(Json(provider))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    body: Result<Json<ProviderInput>, JsonRejection>,
) -> Result<Json<Provider>, ApiError> {
    let id = parse_id("provider", &id)?;
    let Json(input) = body?;
    let conn = ctx.core.open_db()?;
    let provider = repository::update_provider(&conn, &id, input, now())?;
    Ok(Json(provider))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id("provider", &id)?;
    let conn = ctx.core.open_db()?;
    let deleted = repository::soft_delete_provider(&conn, &id, now())?;
    Ok(Json(DeleteResponse {
        id,
        already_deleted: !deleted,
    }))
}
