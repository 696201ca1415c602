//! Clinic endpoints.
//!
//! - `GET /api/clinics`: list (`?name=`, `?include_deleted=`)
//! - `POST /api/clinics`: create
//! - `GET /api/clinics/:id`: detail
//! - `PUT /api/clinics/:id`: replace editable fields
//! - `DELETE /api/clinics/:id`: soft delete, 409 while appointments reference it

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{now, parse_id, ApiContext, DeleteResponse};
use crate::db::repository;
use crate::models::{Clinic, ClinicFilter, ClinicInput};

#[derive(Serialize)]
pub struct ClinicsResponse {
    pub clinics: Vec<Clinic>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<ClinicFilter>, QueryRejection>,
) -> Result<Json<ClinicsResponse>, ApiError> {
    let Query(filter) = query?;
    let conn = ctx.core.open_db()?;
    let clinics = repository::list_clinics(&conn, &filter)?;
    Ok(Json(ClinicsResponse { clinics }))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    body: Result<Json<ClinicInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Clinic>), ApiError> {
    let Json(input) = body?;
    let conn = ctx.core.open_db()?;
    let clinic = repository::create_clinic(&conn, input, now())?;
    Ok((StatusCode::CREATED, Json(clinic)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Clinic>, ApiError> {
    let id = parse_id("clinic", &id)?;
    let conn = ctx.core.open_db()?;
    let clinic = repository::get_clinic(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("clinic {id} not found")))?;
    Ok(Json(clinic))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    body: Result<Json<ClinicInput>, JsonRejection>,
) -> Result<Json<Clinic>, ApiError> {
    let id = parse_id("clinic", &id)?;
    let Json(input) = body?;
    let conn = ctx.core.open_db()?;
    let clinic = repository::update_clinic(&conn, &id, input, now())?;
    Ok(Json(clinic))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id("clinic", &id)?;
    let conn = ctx.core.open_db()?;
    let deleted = repository::soft_delete_clinic(&conn, &id, now())?;
    Ok(Json(DeleteResponse {
        id,
        already_deleted: !deleted,
    }))
}
