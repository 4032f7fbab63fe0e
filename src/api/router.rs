//! HTTP router.
//!
//! `api_router()` returns a `Router` with every resource nested under
//! `config::API_PREFIX`, wrapped in request tracing and CORS.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::config;
use crate::core_state::CoreState;

pub fn api_router(core: Arc<CoreState>, cors_origins: &[String]) -> Router {
    let ctx = ApiContext::new(core);
    build_router(ctx)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn build_router(ctx: ApiContext) -> Router {
    use endpoints::*;

    let routes = Router::new()
        .route("/health", get(health::check))
        // Persons & roles
        .route("/persons", get(persons::list).post(persons::create))
        .route(
            "/persons/:id",
            get(persons::get).put(persons::update).delete(persons::deactivate),
        )
        .route("/persons/:id/roles", get(persons::roles).post(persons::assign_role))
        .route("/persons/:id/roles/:role_type", delete(persons::end_role))
        // Leads
        .route("/leads", get(leads::list).post(leads::intake))
        .route("/leads/:id", get(leads::get))
        .route("/leads/:id/contacted", post(leads::contacted))
        .route("/leads/:id/convert", post(leads::convert))
        .route("/leads/:id/lost", post(leads::lost))
        // Patients
        .route("/patients", get(patients::list).post(patients::create))
        .route("/patients/with-person-id", post(patients::create_for_person))
        .route(
            "/patients/:id",
            get(patients::get).put(patients::update).delete(patients::deactivate),
        )
        .route(
            "/patients/:id/primary-physician",
            get(patients::primary_physician).put(patients::set_primary_physician),
        )
        .route(
            "/patients/:id/physicians",
            get(patients::physicians).post(patients::link_physician),
        )
        .route(
            "/patients/:id/journeys",
            get(patients::journeys).post(patients::open_journey),
        )
        .route("/patients/:id/calls", get(patients::calls))
        .route("/patients/:id/calls/latest", get(patients::latest_call))
        // Physicians & relationships
        .route("/physicians", post(physicians::register))
        .route("/physicians/:id", get(physicians::get))
        .route("/relationships/:id/end", post(physicians::end_relationship))
        // Journeys
        .route("/journeys/:variant/:id", get(journeys::get))
        .route("/journeys/:variant/:id/advance", post(journeys::advance))
        // Call history
        .route("/call-history", post(call_history::record))
        .route(
            "/call-history/:id",
            get(call_history::get)
                .put(call_history::correct)
                .delete(call_history::delete),
        )
        // Reference data
        .route(
            "/medical-conditions",
            get(conditions::list).post(conditions::create),
        )
        .route(
            "/medical-conditions/:id",
            get(conditions::get)
                .put(conditions::update)
                .delete(conditions::deactivate),
        )
        .route("/medical-conditions/:id/aliases", post(conditions::add_alias))
        .route("/contact-types", get(lookups::contact_types))
        .route("/specializations", get(lookups::specializations))
        .route("/hospitals", get(lookups::hospitals).post(lookups::create_hospital))
        .with_state(ctx);

    Router::new().nest(config::API_PREFIX, routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::core_state::tests::seeded_state;

    struct TestApp {
        _dir: tempfile::TempDir,
        router: Router,
    }

    fn test_app() -> TestApp {
        let (dir, core) = seeded_state();
        TestApp {
            _dir: dir,
            router: api_router(core, &["http://localhost:3000".to_string()]),
        }
    }

    impl TestApp {
        async fn send(&self, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
            let mut builder = Request::builder()
                .method(method)
                .uri(format!("{}{path}", config::API_PREFIX));
            let body = match body {
                Some(value) => {
                    builder = builder.header("Content-Type", "application/json");
                    Body::from(value.to_string())
                }
                None => Body::empty(),
            };
            let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        async fn intake(&self, email: &str, condition: &str) -> Value {
            let (status, lead) = self
                .send(
                    "POST",
                    "/leads",
                    Some(json!({
                        "first_name": "Ada",
                        "last_name": "Lovelace",
                        "email": email,
                        "medical_condition": condition,
                        "contact_type": "web_form",
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{lead}");
            lead
        }

        async fn patient(&self, email: &str) -> Value {
            let lead = self.intake(email, "GBM").await;
            let (status, patient) = self
                .send("POST", &format!("/leads/{}/convert", lead["id"].as_str().unwrap()), None)
                .await;
            assert_eq!(status, StatusCode::OK);
            patient
        }

        async fn physician(&self, email: &str) -> Value {
            let (status, physician) = self
                .send(
                    "POST",
                    "/physicians",
                    Some(json!({ "first_name": "Gregory", "last_name": "House", "email": email })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{physician}");
            physician
        }
    }

    fn id(value: &Value) -> &str {
        value["id"].as_str().unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = test_app();
        let (status, body) = app.send("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], config::APP_VERSION);
    }

    #[tokio::test]
    async fn repeated_intake_lands_on_one_lead() {
        let app = test_app();
        let first = app.intake("a@x.com", "Glioblastoma").await;
        let second = app.intake("a@x.com", "gbm").await;
        assert_eq!(first["id"], second["id"]);

        let (_, persons) = app.send("GET", "/persons", None).await;
        assert_eq!(persons["total"], 1);
        let (_, leads) = app.send("GET", "/leads?status=new", None).await;
        assert_eq!(leads["total"], 1);
    }

    #[tokio::test]
    async fn unknown_condition_label_is_422() {
        let app = test_app();
        let (status, body) = app
            .send(
                "POST",
                "/leads",
                Some(json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": "a@x.com",
                    "medical_condition": "Common cold",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["field"], "medical_condition");
    }

    #[tokio::test]
    async fn bad_email_is_422() {
        let app = test_app();
        let (status, body) = app
            .send(
                "POST",
                "/leads",
                Some(json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": "not-an-email",
                    "medical_condition": "DMD",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["field"], "email");
    }

    #[tokio::test]
    async fn converting_twice_is_invalid_transition() {
        let app = test_app();
        let lead = app.intake("a@x.com", "DMD").await;
        let path = format!("/leads/{}/convert", id(&lead));

        let (status, patient) = app.send("POST", &path, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patient["status"], "active");

        let (status, body) = app.send("POST", &path, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

        let (_, roles) = app
            .send("GET", &format!("/persons/{}/roles", patient["person_id"].as_str().unwrap()), None)
            .await;
        let roles: Vec<&str> = roles.as_array().unwrap().iter().map(|r| r["role_type"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["patient"]);
    }

    #[tokio::test]
    async fn role_ledger_over_http() {
        let app = test_app();
        let physician = app.physician("house@x.com").await;
        let roles_path = format!("/persons/{}/roles", physician["person_id"].as_str().unwrap());

        let (status, _) = app.send("POST", &roles_path, Some(json!({ "role_type": "lead" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, active) = app.send("GET", &roles_path, None).await;
        assert_eq!(active.as_array().unwrap().len(), 2);

        let (status, _) = app.send("DELETE", &format!("{roles_path}/lead"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.send("DELETE", &format!("{roles_path}/lead"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, history) = app.send("GET", &format!("{roles_path}?history=true&role_type=lead"), None).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["is_active"], false);
    }

    #[tokio::test]
    async fn lost_accepts_missing_body() {
        let app = test_app();
        let lead = app.intake("a@x.com", "IPF").await;
        let (status, body) = app.send("POST", &format!("/leads/{}/lost", id(&lead)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "lost");
        assert!(body["lost_reason"].is_null());
    }

    #[tokio::test]
    async fn malformed_id_is_400() {
        let app = test_app();
        let (status, body) = app.send("GET", "/patients/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn missing_patient_is_404() {
        let app = test_app();
        let (status, body) = app
            .send("GET", &format!("/patients/{}", uuid::Uuid::new_v4()), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn patient_list_is_paginated() {
        let app = test_app();
        for n in 0..3 {
            app.patient(&format!("p{n}@x.com")).await;
        }
        let (status, page) = app.send("GET", "/patients?page=2&page_size=2&status=active", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 3);
        assert_eq!(page["page"], 2);
        assert_eq!(page["page_size"], 2);
        assert_eq!(page["total_pages"], 2);
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ending_a_role_never_held_is_a_no_op() {
        let app = test_app();
        let patient = app.patient("a@x.com").await;
        let person_id = patient["person_id"].as_str().unwrap();

        let (status, body) = app
            .send("DELETE", &format!("/persons/{person_id}/roles/physician"), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT, "{body}");
        let (_, active) = app.send("GET", &format!("/persons/{person_id}/roles"), None).await;
        assert_eq!(active[0]["role_type"], "patient");

        let missing = uuid::Uuid::new_v4();
        let (status, _) = app
            .send("DELETE", &format!("/persons/{missing}/roles/physician"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn person_create_resolves_by_email() {
        let app = test_app();
        let body = json!({ "first_name": "Grace", "last_name": "Hopper", "email": "g@x.com" });
        let (status, first) = app.send("POST", "/persons", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{first}");

        let body = json!({ "first_name": "Grace", "last_name": "Murray", "email": "g@x.com" });
        let (status, second) = app.send("POST", "/persons", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(second["id"], first["id"]);
        assert_eq!(second["last_name"], "Murray");

        let (status, body) = app
            .send("POST", "/persons", Some(json!({ "first_name": "X", "last_name": "Y", "email": "nope" })))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["field"], "email");
    }

    #[tokio::test]
    async fn existing_person_becomes_patient_by_id() {
        let app = test_app();
        let physician = app.physician("house@x.com").await;
        let condition = app.patient("other@x.com").await["medical_condition_id"].clone();
        let request = json!({ "person_id": physician["person_id"], "medical_condition_id": condition });

        let (status, patient) = app.send("POST", "/patients/with-person-id", Some(request.clone())).await;
        assert_eq!(status, StatusCode::CREATED, "{patient}");
        assert_eq!(patient["person_id"], physician["person_id"]);
        assert_eq!(patient["status"], "active");

        let (status, body) = app.send("POST", "/patients/with-person-id", Some(request)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "DUPLICATE_PATIENT");

        let unknown = json!({ "person_id": uuid::Uuid::new_v4(), "medical_condition_id": condition });
        let (status, _) = app.send("POST", "/patients/with-person-id", Some(unknown)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_patient_is_409() {
        let app = test_app();
        let patient = app.patient("a@x.com").await;
        let (status, body) = app
            .send(
                "POST",
                "/patients",
                Some(json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": "a@x.com",
                    "medical_condition_id": patient["medical_condition_id"],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "DUPLICATE_PATIENT");
    }

    #[tokio::test]
    async fn primary_physician_swap() {
        let app = test_app();
        let patient = app.patient("p@x.com").await;
        let a = app.physician("a@hospital.org").await;
        let b = app.physician("b@hospital.org").await;
        let path = format!("/patients/{}/primary-physician", id(&patient));

        let (status, _) = app.send("PUT", &path, Some(json!({ "physician_id": id(&a) }))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.send("PUT", &path, Some(json!({ "physician_id": id(&b) }))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, primary) = app.send("GET", &path, None).await;
        assert_eq!(primary["physician_id"], b["id"]);

        let (_, edges) = app.send("GET", &format!("/patients/{}/physicians", id(&patient)), None).await;
        let primaries = edges.as_array().unwrap().iter().filter(|e| e["is_primary"] == true).count();
        assert_eq!(primaries, 1);
    }

    #[tokio::test]
    async fn journey_advances_within_its_variant() {
        let app = test_app();
        let patient = app.patient("p@x.com").await;
        let (status, journey) = app
            .send(
                "POST",
                &format!("/patients/{}/journeys", id(&patient)),
                Some(json!({ "variant": "access_program", "program_id": "EAP-7" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(journey["status"], "pending");

        let advance = format!("/journeys/access_program/{}/advance", id(&journey));
        let (status, body) = app.send("POST", &advance, Some(json!({ "status": "screening" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["field"], "status");

        let (status, body) = app
            .send("POST", &advance, Some(json!({ "status": "active", "milestone_date": "2024-02-01" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enrollment_date"], "2024-02-01");

        let (status, body) = app.send("POST", &advance, Some(json!({ "status": "pending" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
    }

    #[tokio::test]
    async fn calls_are_rows_and_latest_wins() {
        let app = test_app();
        let patient = app.patient("p@x.com").await;
        for day in ["2024-01-01", "2024-01-03", "2024-01-02"] {
            let (status, _) = app
                .send(
                    "POST",
                    "/call-history",
                    Some(json!({ "patient_id": id(&patient), "call_date": format!("{day}T09:30:00") })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, calls) = app.send("GET", &format!("/patients/{}/calls", id(&patient)), None).await;
        assert_eq!(calls["total"], 3);
        let (_, latest) = app.send("GET", &format!("/patients/{}/calls/latest", id(&patient)), None).await;
        assert_eq!(latest["call_date"], "2024-01-03T09:30:00");

        let (status, _) = app.send("DELETE", &format!("/call-history/{}", id(&latest)), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, calls) = app.send("GET", &format!("/patients/{}/calls", id(&patient)), None).await;
        assert_eq!(calls["total"], 2);
    }

    #[tokio::test]
    async fn call_dates_accept_offsets_and_bare_dates() {
        let app = test_app();
        let patient = app.patient("p@x.com").await;

        let (status, call) = app
            .send(
                "POST",
                "/call-history",
                Some(json!({
                    "patient_id": id(&patient),
                    "call_date": "2024-01-25T10:30:00Z",
                    "reminder_date": "2024-01-26T09:00:00+01:00",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{call}");
        assert_eq!(call["call_date"], "2024-01-25T10:30:00");
        assert_eq!(call["reminder_date"], "2024-01-26T08:00:00");

        let (status, call) = app
            .send(
                "POST",
                "/call-history",
                Some(json!({ "patient_id": id(&patient), "booking_date": "2024-01-01" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{call}");
        assert_eq!(call["booking_date"], "2024-01-01T00:00:00");

        let (status, fixed) = app
            .send("PUT", &format!("/call-history/{}", id(&call)), Some(json!({ "call_date": "2024-02-01Z" })))
            .await;
        assert!(status.is_client_error(), "{fixed}");
    }

    #[tokio::test]
    async fn new_condition_is_resolvable_after_create() {
        let app = test_app();
        let (status, condition) = app
            .send(
                "POST",
                "/medical-conditions",
                Some(json!({ "name": "Amyotrophic Lateral Sclerosis", "abbreviation": "ALS" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = app
            .send(
                "POST",
                &format!("/medical-conditions/{}/aliases", id(&condition)),
                Some(json!({ "alias": "Lou Gehrig's disease" })),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let lead = app.intake("a@x.com", "lou gehrig's disease").await;
        assert_eq!(lead["medical_condition_id"], condition["id"]);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let app = test_app();
        let request = Request::builder()
            .method("OPTIONS")
            .uri(format!("{}/patients", config::API_PREFIX))
            .header("Origin", "http://localhost:3000")
            .header("Access-Control-Request-Method", "GET")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }
}
