//! Call history endpoints. Every call is its own row.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath};
use crate::engine::interactions;
use crate::models::*;

pub async fn record(
    State(ctx): State<ApiContext>,
    ApiJson(new): ApiJson<NewInteraction>,
) -> Result<(StatusCode, Json<Interaction>), ApiError> {
    let interaction = ctx
        .with_db(move |conn| Ok(interactions::record_interaction(conn, &new)?))
        .await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Interaction>, ApiError> {
    let interaction = ctx.with_db(move |conn| Ok(interactions::get_interaction(conn, &id)?)).await?;
    Ok(Json(interaction))
}

/// `PUT /api/v1/call-history/:id`: corrects this row only.
pub async fn correct(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(correction): ApiJson<InteractionCorrection>,
) -> Result<Json<Interaction>, ApiError> {
    let interaction = ctx
        .with_db(move |conn| Ok(interactions::correct_interaction(conn, &id, &correction)?))
        .await?;
    Ok(Json(interaction))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    ctx.with_db(move |conn| Ok(interactions::delete_interaction(conn, &id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}
