//! Delta sync endpoints.
//!
//! `POST /api/sync`: client pushes queued appointment deltas together with
//! the version counters it last saw; the server applies the deltas and
//! returns every entity collection whose counter moved. Returns 204 No
//! Content if nothing changed and no deltas were sent.
//!
//! `GET /api/sync/versions`: current counters.
//! `POST /api/sync/reset`: advance every counter, forcing full resync.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{now, ApiContext};
use crate::sync;

pub async fn delta(
    State(ctx): State<ApiContext>,
    body: Result<Json<sync::SyncRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let conn = ctx.core.open_db()?;

    tracing::info!(
        clinics = request.versions.clinics,
        patients = request.versions.patients,
        providers = request.versions.providers,
        visits = request.versions.visits,
        appointments = request.versions.appointments,
        deltas = request.deltas.len(),
        "Sync request"
    );

    let response = sync::build_sync_response(&conn, &request, now())?;

    match response {
        None => Ok(StatusCode::NO_CONTENT.into_response()),
        Some(resp) => {
            let (applied, skipped) = resp
                .deltas
                .as_ref()
                .map(|d| (d.applied.len(), d.skipped.len()))
                .unwrap_or((0, 0));
            tracing::info!(
                sent = %resp.sent_kinds().join(","),
                applied,
                skipped,
                "Sync respond"
            );
            Ok(Json(resp).into_response())
        }
    }
}

pub async fn versions(
    State(ctx): State<ApiContext>,
) -> Result<Json<sync::SyncVersions>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(sync::get_sync_versions(&conn)?))
}

pub async fn reset(State(ctx): State<ApiContext>) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    sync::reset_sync_versions(&conn)?;
    Ok(StatusCode::NO_CONTENT)
}
