//! HTTP API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. `Cache-Control: no-store` → 3. Access logger

use std::sync::Arc;

use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router with every endpoint under `/api/`.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/clinics",
            get(endpoints::clinics::list).post(endpoints::clinics::create),
        )
        .route(
            "/clinics/:id",
            get(endpoints::clinics::detail)
                .put(endpoints::clinics::update)
                .delete(endpoints::clinics::remove),
        )
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::remove),
        )
        .route("/patients/:id/visits", get(endpoints::patients::visits))
        .route(
            "/providers",
            get(endpoints::providers::list).post(endpoints::providers::create),
        )
        .route(
            "/providers/:id",
            get(endpoints::providers::detail)
                .put(endpoints::providers::update)
                .delete(endpoints::providers::remove),
        )
        .route("/visits/:id", get(endpoints::visits::detail))
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route(
            "/appointments/:id",
            get(endpoints::appointments::detail)
                .put(endpoints::appointments::upsert)
                .delete(endpoints::appointments::remove),
        )
        .route("/sync", post(endpoints::sync::delta))
        .route("/sync/versions", get(endpoints::sync::versions))
        .route("/sync/reset", post(endpoints::sync::reset))
        .with_state(ctx);

    // Layers wrap bottom-up: the last one added runs first.
    let routes = routes
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive());

    Router::new().nest("/api", routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    /// Router over a fresh on-disk database. Keep the guard alive for the
    /// duration of the test.
    fn test_app() -> (Router, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let core = CoreState::initialize(tmp.path().join("clinic.db")).unwrap();
        (api_router(Arc::new(core)), tmp)
    }

    fn make_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    async fn create_clinic(app: &Router, name: &str) -> String {
        let (status, body) = send(
            app,
            make_request("POST", "/api/clinics", Some(json!({ "name": name }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_patient(app: &Router, first: &str, last: &str) -> String {
        let (status, body) = send(
            app,
            make_request(
                "POST",
                "/api/patients",
                Some(json!({ "first_name": first, "last_name": last })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn book(app: &Router, clinic_id: &str, patient_id: &str) -> Value {
        let (status, body) = send(
            app,
            make_request(
                "POST",
                "/api/appointments",
                Some(json!({
                    "clinic_id": clinic_id,
                    "patient_id": patient_id,
                    "starts_at": "2025-03-10T09:30:00",
                    "duration_minutes": 30,
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    #[tokio::test]
    async fn health_reports_database_ok() {
        let (app, _tmp) = test_app();
        let response = app
            .clone()
            .oneshot(make_request("GET", "/api/health", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Cache-Control").unwrap(),
            "no-store"
        );

        let (_, body) = send(&app, make_request("GET", "/api/health", None)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], true);
    }

    #[tokio::test]
    async fn not_found_for_unknown_route() {
        let (app, _tmp) = test_app();
        let response = app
            .oneshot(make_request("GET", "/api/nonexistent", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn clinic_crud_round_trip() {
        let (app, _tmp) = test_app();
        let id = create_clinic(&app, "Northside").await;

        let (status, body) = send(&app, make_request("GET", &format!("/api/clinics/{id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Northside");

        let (status, body) = send(
            &app,
            make_request(
                "PUT",
                &format!("/api/clinics/{id}"),
                Some(json!({ "name": "Northside Family", "phone": "555-0100" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Northside Family");
        assert_eq!(body["phone"], "555-0100");

        let (status, body) = send(&app, make_request("GET", "/api/clinics?name=family", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["clinics"].as_array().unwrap().len(), 1);

        let (status, body) =
            send(&app, make_request("DELETE", &format!("/api/clinics/{id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["already_deleted"], false);

        let (_, body) = send(&app, make_request("GET", "/api/clinics", None)).await;
        assert!(body["clinics"].as_array().unwrap().is_empty());

        let (_, body) = send(&app, make_request("GET", &format!("/api/clinics/{id}"), None)).await;
        assert_eq!(body["is_deleted"], true);
    }

    #[tokio::test]
    async fn repeated_delete_reports_already_deleted() {
        let (app, _tmp) = test_app();
        let id = create_clinic(&app, "Eastside").await;
        send(&app, make_request("DELETE", &format!("/api/clinics/{id}"), None)).await;

        let (status, body) =
            send(&app, make_request("DELETE", &format!("/api/clinics/{id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["already_deleted"], true);
    }

    #[tokio::test]
    async fn missing_clinic_returns_404() {
        let (app, _tmp) = test_app();
        let (status, body) = send(
            &app,
            make_request("GET", &format!("/api/clinics/{}", Uuid::new_v4()), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_returns_400() {
        let (app, _tmp) = test_app();
        let (status, body) = send(&app, make_request("GET", "/api/patients/not-a-uuid", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn malformed_body_returns_400() {
        let (app, _tmp) = test_app();
        let (status, body) = send(
            &app,
            make_request("POST", "/api/clinics", Some(json!({ "address": "no name" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn blank_clinic_name_returns_400() {
        let (app, _tmp) = test_app();
        let (status, _) = send(
            &app,
            make_request("POST", "/api/clinics", Some(json!({ "name": "   " }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn provider_must_reference_live_clinic() {
        let (app, _tmp) = test_app();
        let (status, _) = send(
            &app,
            make_request(
                "POST",
                "/api/providers",
                Some(json!({ "clinic_id": Uuid::new_v4(), "name": "Dr. Who" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let clinic_id = create_clinic(&app, "Westside").await;
        let (status, body) = send(
            &app,
            make_request(
                "POST",
                "/api/providers",
                Some(json!({ "clinic_id": clinic_id, "name": "Dr. Grey", "specialty": "Cardiology" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["clinic_id"], clinic_id.as_str());

        let (_, body) = send(
            &app,
            make_request("GET", "/api/providers?specialty=Cardiology", None),
        )
        .await;
        assert_eq!(body["providers"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn booking_opens_visit_and_lists_it() {
        let (app, _tmp) = test_app();
        let clinic_id = create_clinic(&app, "Central").await;
        let patient_id = create_patient(&app, "Ann", "Lee").await;

        let saved = book(&app, &clinic_id, &patient_id).await;
        assert_eq!(saved["visit_created"], true);
        assert_eq!(saved["appointment"]["status"], "scheduled");
        let visit_id = saved["appointment"]["visit_id"].as_str().unwrap().to_string();

        let (status, body) =
            send(&app, make_request("GET", &format!("/api/visits/{visit_id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patient_id"], patient_id.as_str());

        let (_, body) = send(
            &app,
            make_request("GET", &format!("/api/patients/{patient_id}/visits"), None),
        )
        .await;
        assert_eq!(body["visits"].as_array().unwrap().len(), 1);

        let (_, body) = send(
            &app,
            make_request(
                "GET",
                &format!("/api/appointments?patient_id={patient_id}&from=2025-03-10T00:00:00"),
                None,
            ),
        )
        .await;
        assert_eq!(body["appointments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn put_appointment_uses_path_id() {
        let (app, _tmp) = test_app();
        let clinic_id = create_clinic(&app, "Central").await;
        let patient_id = create_patient(&app, "Ann", "Lee").await;
        let id = Uuid::new_v4();

        let (status, body) = send(
            &app,
            make_request(
                "PUT",
                &format!("/api/appointments/{id}"),
                Some(json!({
                    "id": Uuid::new_v4(),
                    "clinic_id": clinic_id,
                    "patient_id": patient_id,
                    "starts_at": "2025-03-11T14:00:00",
                    "duration_minutes": 45,
                    "status": "confirmed",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["appointment"]["id"], id.to_string());
        assert_eq!(body["appointment"]["status"], "confirmed");

        let (status, _) =
            send(&app, make_request("GET", &format!("/api/appointments/{id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn clinic_delete_refused_while_booked() {
        let (app, _tmp) = test_app();
        let clinic_id = create_clinic(&app, "Busy").await;
        let patient_id = create_patient(&app, "Bo", "Chan").await;
        let saved = book(&app, &clinic_id, &patient_id).await;
        let appt_id = saved["appointment"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            make_request("DELETE", &format!("/api/clinics/{clinic_id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");

        let (status, _) = send(
            &app,
            make_request("DELETE", &format!("/api/appointments/{appt_id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            make_request("DELETE", &format!("/api/clinics/{clinic_id}"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn sync_returns_204_when_current() {
        let (app, _tmp) = test_app();
        let (status, versions) = send(&app, make_request("GET", "/api/sync/versions", None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            make_request("POST", "/api/sync", Some(json!({ "versions": versions }))),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn sync_applies_deltas_and_returns_changes() {
        let (app, _tmp) = test_app();
        let clinic_id = create_clinic(&app, "Central").await;
        let patient_id = create_patient(&app, "Ann", "Lee").await;
        let (_, versions) = send(&app, make_request("GET", "/api/sync/versions", None)).await;

        let appt_id = Uuid::new_v4();
        let (status, body) = send(
            &app,
            make_request(
                "POST",
                "/api/sync",
                Some(json!({
                    "versions": versions,
                    "deltas": [
                        {
                            "op": "upsert",
                            "appointment": {
                                "id": appt_id,
                                "clinic_id": clinic_id,
                                "patient_id": patient_id,
                                "starts_at": "2025-03-12T08:00:00",
                                "duration_minutes": 20,
                            }
                        },
                        { "op": "delete", "id": Uuid::new_v4() }
                    ]
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["deltas"]["applied"].as_array().unwrap().len(), 1);
        assert_eq!(body["deltas"]["skipped"].as_array().unwrap().len(), 1);
        assert_eq!(body["appointments"].as_array().unwrap().len(), 1);
        assert_eq!(body["visits"].as_array().unwrap().len(), 1);
        assert!(body["clinics"].is_null());
    }

    #[tokio::test]
    async fn sync_reset_forces_full_resync() {
        let (app, _tmp) = test_app();
        create_clinic(&app, "Central").await;
        let (_, versions) = send(&app, make_request("GET", "/api/sync/versions", None)).await;
        assert!(versions["clinics"].as_i64().unwrap() > 0);

        let (status, _) = send(&app, make_request("POST", "/api/sync/reset", None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Client still holds the old counters, which now differ
        let (status, body) = send(
            &app,
            make_request("POST", "/api/sync", Some(json!({ "versions": versions }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["clinics"].as_array().unwrap().len(), 1);
        assert_eq!(body["versions"]["clinics"], 2);

        // A brand-new client with no counters also gets everything
        let (status, body) =
            send(&app, make_request("POST", "/api/sync", Some(json!({})))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["clinics"].as_array().unwrap().len(), 1);
        assert!(body["patients"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn post_with_existing_id_returns_200() {
        let (app, _tmp) = test_app();
        let clinic_id = create_clinic(&app, "Central").await;
        let patient_id = create_patient(&app, "Ann", "Lee").await;
        let saved = book(&app, &clinic_id, &patient_id).await;
        assert_eq!(saved["updated"], false);
        let id = saved["appointment"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            make_request(
                "POST",
                "/api/appointments",
                Some(json!({
                    "id": id,
                    "clinic_id": clinic_id,
                    "patient_id": patient_id,
                    "starts_at": "2025-03-10T10:00:00",
                    "duration_minutes": 30,
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["updated"], true);
        assert_eq!(body["visit_created"], false);
    }
}
