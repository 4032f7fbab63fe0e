//! Physician endpoints and relationship termination.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath};
use crate::engine::{physicians, relationships};
use crate::models::*;

/// `POST /api/v1/physicians`: resolves the Person by email first.
pub async fn register(
    State(ctx): State<ApiContext>,
    ApiJson(registration): ApiJson<PhysicianRegistration>,
) -> Result<(StatusCode, Json<Physician>), ApiError> {
    let physician = ctx
        .with_db(move |conn| Ok(physicians::register_physician(conn, &registration)?))
        .await?;
    Ok((StatusCode::CREATED, Json(physician)))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Physician>, ApiError> {
    let physician = ctx.with_db(move |conn| Ok(physicians::get_physician(conn, &id)?)).await?;
    Ok(Json(physician))
}

#[derive(Debug, Default, Deserialize)]
pub struct EndRelationshipRequest {
    pub end_date: Option<NaiveDate>,
}

/// `POST /api/v1/relationships/:id/end`: `end_date` defaults to today.
pub async fn end_relationship(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<EndRelationshipRequest>>,
) -> Result<Json<PatientPhysicianRelationship>, ApiError> {
    let end_date = body.and_then(|ApiJson(b)| b.end_date);
    let edge = ctx
        .with_db(move |conn| Ok(relationships::end_relationship(conn, &id, end_date)?))
        .await?;
    Ok(Json(edge))
}
