//! Appointment endpoints.
//!
//! - `GET /api/appointments`: list with filters, earliest first
//! - `POST /api/appointments`: book (opens a visit when needed)
//! - `GET /api/appointments/:id`: detail
//! - `PUT /api/appointments/:id`: upsert under the path id
//! - `DELETE /api/appointments/:id`: soft delete

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{now, parse_id, ApiContext, DeleteResponse};
use crate::appointment::{self, SavedAppointment};
use crate::db::repository;
use crate::models::{Appointment, AppointmentFilter, AppointmentInput};

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<AppointmentFilter>, QueryRejection>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let Query(filter) = query?;
    let conn = ctx.core.open_db()?;
    let appointments = repository::list_appointments(&conn, &filter)?;
    Ok(Json(AppointmentsResponse { appointments }))
}

/// `POST /api/appointments`. A body `id` is honoured, so this doubles as an
/// upsert for clients that mint their own ids: 201 when a row was created,
/// 200 when an existing one was updated.
pub async fn create(
    State(ctx): State<ApiContext>,
    body: Result<Json<AppointmentInput>, JsonRejection>,
) -> Result<(StatusCode, Json<SavedAppointment>), ApiError> {
    let Json(input) = body?;
    let conn = ctx.core.open_db()?;
    let saved = appointment::save_appointment(&conn, input, now())?;
    let status = if saved.updated {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(saved)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let id = parse_id("appointment", &id)?;
    let conn = ctx.core.open_db()?;
    let appt = repository::get_appointment(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("appointment {id} not found")))?;
    Ok(Json(appt))
}

/// `PUT /api/appointments/:id`. The path id wins over any body id.
pub async fn upsert(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    body: Result<Json<AppointmentInput>, JsonRejection>,
) -> Result<Json<SavedAppointment>, ApiError> {
    let id = parse_id("appointment", &id)?;
    let Json(mut input) = body?;
    input.id = Some(id);
    let conn = ctx.core.open_db()?;
    let saved = appointment::save_appointment(&conn, input, now())?;
    Ok(Json(saved))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id("appointment", &id)?;
    let conn = ctx.core.open_db()?;
    let deleted = appointment::delete_appointment(&conn, &id, now())?;
    Ok(Json(DeleteResponse {
        id,
        already_deleted: !deleted,
    }))
}
