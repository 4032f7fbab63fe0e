//! Journey endpoints, addressed by variant and id.

use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath};
use crate::engine::journeys;
use crate::models::enums::JourneyVariant;
use crate::models::{Journey, JourneyStatus};

pub async fn get(
    State(ctx): State<ApiContext>,
    ApiPath((variant, id)): ApiPath<(JourneyVariant, Uuid)>,
) -> Result<Json<Journey>, ApiError> {
    let journey = ctx
        .with_db(move |conn| Ok(journeys::get_journey(conn, variant, &id)?))
        .await?;
    Ok(Json(journey))
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub status: String,
    pub milestone_date: Option<NaiveDate>,
}

/// `POST /api/v1/journeys/:variant/:id/advance`
///
/// The status string is read in the journey's own lifecycle, so a status
/// that only exists in the other variant is a validation error.
pub async fn advance(
    State(ctx): State<ApiContext>,
    ApiPath((variant, id)): ApiPath<(JourneyVariant, Uuid)>,
    ApiJson(request): ApiJson<AdvanceRequest>,
) -> Result<Json<Journey>, ApiError> {
    let next = JourneyStatus::parse(variant, request.status.trim()).map_err(|_| {
        ApiError::validation(
            "status",
            format!("'{}' is not a {} status", request.status, variant),
        )
    })?;
    let journey = ctx
        .with_db(move |conn| {
            Ok(journeys::advance_journey(conn, variant, &id, next, request.milestone_date)?)
        })
        .await?;
    Ok(Json(journey))
}
