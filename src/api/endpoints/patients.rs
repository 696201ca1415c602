//! Patient endpoints.
//!
//! - `GET /api/patients`: list (`?q=`, `?clinic_id=`, `?include_deleted=`)
//! - `POST /api/patients`: create
//! - `GET|PUT|DELETE /api/patients/:id`
//! - `GET /api/patients/:id/visits`: visit history, newest first

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{now, parse_id, ApiContext, DeleteResponse};
use crate::db::repository;
use crate::models::{Patient, PatientFilter, PatientInput, Visit};

#[derive(Serialize)]
pub struct PatientsResponse {
    pub patients: Vec<Patient>,
}

#[derive(Serialize)]
pub struct VisitsResponse {
    pub visits: Vec<Visit>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<PatientFilter>, QueryRejection>,
) -> Result<Json<PatientsResponse>, ApiError> {
    let Query(filter) = query?;
    let conn = ctx.core.open_db()?;
    let patients = repository::list_patients(&conn, &filter)?;
    Ok(Json(PatientsResponse { patients }))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    body: Result<Json<PatientInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(input) = body?;
    let conn = ctx.core.open_db()?;
    let patient = repository::create_patient(&conn, input, now())?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id("patient", &id)?;
    let conn = ctx.core.open_db()?;
    let patient = repository::get_patient(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("patient {id} not found")))?;
    Ok(Json(patient))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    body: Result<Json<PatientInput>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id("patient", &id)?;
    let Json(input) = body?;
    let conn = ctx.core.open_db()?;
    let patient = repository::update_patient(&conn, &id, input, now())?;
    Ok(Json(patient))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id("patient", &id)?;
    let conn = ctx.core.open_db()?;
    let deleted = repository::soft_delete_patient(&conn, &id, now())?;
    Ok(Json(DeleteResponse {
        id,
        already_deleted: !deleted,
    }))
}

pub async fn visits(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<VisitsResponse>, ApiError> {
    let id = parse_id("patient", &id)?;
    let conn = ctx.core.open_db()?;
    if repository::get_patient(&conn, &id)?.is_none() {
        return Err(ApiError::NotFound(format!("patient {id} not found")));
    }
    let visits = repository::list_visits_for_patient(&conn, &id)?;
    Ok(Json(VisitsResponse { visits }))
}
