//! Patient endpoints and the resources hanging off a patient.
//!
//! - `POST /patients`, `GET /patients`, `GET|PUT|DELETE /patients/:id`
//! - `POST /patients/with-person-id`: an existing Person becomes a Patient
//! - `GET|PUT /patients/:id/primary-physician`
//! - `GET|POST /patients/:id/physicians`
//! - `GET|POST /patients/:id/journeys`
//! - `GET /patients/:id/calls`, `GET /patients/:id/calls/latest`

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, ApiQuery, PageQuery};
use crate::engine::{interactions, journeys, patients, relationships};
use crate::models::enums::{JourneyVariant, PatientStatus, RelationshipType};
use crate::models::*;

pub async fn create(
    State(ctx): State<ApiContext>,
    ApiJson(new): ApiJson<NewPatient>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let patient = ctx.with_db(move |conn| Ok(patients::create_patient(conn, &new)?)).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn create_for_person(
    State(ctx): State<ApiContext>,
    ApiJson(new): ApiJson<NewPatientForPerson>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let patient = ctx
        .with_db(move |conn| Ok(patients::create_patient_for_person(conn, &new)?))
        .await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientListQuery {
    pub status: Option<PatientStatus>,
    pub medical_condition_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// `GET /api/v1/patients`: paginated, `{items, total, page, page_size, total_pages}`.
pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<PatientListQuery>,
) -> Result<Json<Page<Patient>>, ApiError> {
    let page = PageRequest::new(query.page, query.page_size);
    let filter = PatientFilter {
        status: query.status,
        medical_condition_id: query.medical_condition_id,
    };
    let patients = ctx
        .with_db(move |conn| Ok(patients::list_patients(conn, &filter, page)?))
        .await?;
    Ok(Json(patients))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    let patient = ctx.with_db(move |conn| Ok(patients::get_patient(conn, &id)?)).await?;
    Ok(Json(patient))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<PatientUpdate>,
) -> Result<Json<Patient>, ApiError> {
    let patient = ctx
        .with_db(move |conn| Ok(patients::update_patient(conn, &id, &update)?))
        .await?;
    Ok(Json(patient))
}

/// `DELETE /api/v1/patients/:id`: soft delete, status becomes inactive.
pub async fn deactivate(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    let patient = ctx.with_db(move |conn| Ok(patients::deactivate_patient(conn, &id)?)).await?;
    Ok(Json(patient))
}

// ── Physicians ──────────────────────────────────────────

/// `null` when the patient has no open primary edge.
pub async fn primary_physician(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Option<PatientPhysicianRelationship>>, ApiError> {
    let edge = ctx
        .with_db(move |conn| Ok(relationships::primary_physician(conn, &id)?))
        .await?;
    Ok(Json(edge))
}

#[derive(Debug, Deserialize)]
pub struct PrimaryPhysicianRequest {
    pub physician_id: Uuid,
}

pub async fn set_primary_physician(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<PrimaryPhysicianRequest>,
) -> Result<Json<PatientPhysicianRelationship>, ApiError> {
    let edge = ctx
        .with_db(move |conn| Ok(relationships::set_primary_physician(conn, &id, &request.physician_id)?))
        .await?;
    Ok(Json(edge))
}

pub async fn physicians(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<PatientPhysicianRelationship>>, ApiError> {
    let edges = ctx
        .with_db(move |conn| Ok(relationships::list_relationships(conn, &id)?))
        .await?;
    Ok(Json(edges))
}

#[derive(Debug, Deserialize)]
pub struct LinkPhysicianRequest {
    pub physician_id: Uuid,
    pub relationship_type: RelationshipType,
}

pub async fn link_physician(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<LinkPhysicianRequest>,
) -> Result<(StatusCode, Json<PatientPhysicianRelationship>), ApiError> {
    let edge = ctx
        .with_db(move |conn| {
            Ok(relationships::link_physician(
                conn,
                &id,
                &request.physician_id,
                request.relationship_type,
            )?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

// ── Journeys ────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct JourneyListQuery {
    pub variant: Option<JourneyVariant>,
}

pub async fn journeys(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<JourneyListQuery>,
) -> Result<Json<Vec<Journey>>, ApiError> {
    let journeys = ctx
        .with_db(move |conn| Ok(journeys::list_journeys(conn, &id, query.variant)?))
        .await?;
    Ok(Json(journeys))
}

pub async fn open_journey(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(new): ApiJson<NewJourney>,
) -> Result<(StatusCode, Json<Journey>), ApiError> {
    let journey = ctx.with_db(move |conn| Ok(journeys::open_journey(conn, &id, &new)?)).await?;
    Ok((StatusCode::CREATED, Json(journey)))
}

// ── Calls ───────────────────────────────────────────────

/// Most recent call first.
pub async fn calls(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Page<Interaction>>, ApiError> {
    let page = query.request();
    let calls = ctx
        .with_db(move |conn| Ok(interactions::list_interactions(conn, &id, page)?))
        .await?;
    Ok(Json(calls))
}

pub async fn latest_call(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Option<Interaction>>, ApiError> {
    let call = ctx
        .with_db(move |conn| Ok(interactions::latest_interaction(conn, &id)?))
        .await?;
    Ok(Json(call))
}
