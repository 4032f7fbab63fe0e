//! Medical condition administration.
//!
//! Every write here reloads the lookup registry so free-text intake sees the
//! change on the next request.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, ApiQuery};
use crate::engine::lookups;
use crate::models::*;

pub async fn create(
    State(ctx): State<ApiContext>,
    ApiJson(new): ApiJson<NewMedicalCondition>,
) -> Result<(StatusCode, Json<MedicalCondition>), ApiError> {
    let condition = ctx.with_db(move |conn| Ok(lookups::create_condition(conn, &new)?)).await?;
    ctx.core.reload_registry()?;
    Ok((StatusCode::CREATED, Json(condition)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ConditionListQuery {
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<ConditionListQuery>,
) -> Result<Json<Page<MedicalCondition>>, ApiError> {
    let page = PageRequest::new(query.page, query.page_size);
    let conditions = ctx
        .with_db(move |conn| Ok(lookups::list_conditions(conn, query.is_active, page)?))
        .await?;
    Ok(Json(conditions))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MedicalCondition>, ApiError> {
    let condition = ctx.with_db(move |conn| Ok(lookups::get_condition(conn, &id)?)).await?;
    Ok(Json(condition))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<MedicalConditionUpdate>,
) -> Result<Json<MedicalCondition>, ApiError> {
    let condition = ctx
        .with_db(move |conn| Ok(lookups::update_condition(conn, &id, &update)?))
        .await?;
    ctx.core.reload_registry()?;
    Ok(Json(condition))
}

/// `DELETE /api/v1/medical-conditions/:id`: soft delete. Patients and leads
/// keep their link; new intake against it is rejected.
pub async fn deactivate(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MedicalCondition>, ApiError> {
    let condition = ctx
        .with_db(move |conn| Ok(lookups::set_condition_active(conn, &id, false)?))
        .await?;
    ctx.core.reload_registry()?;
    Ok(Json(condition))
}

#[derive(Debug, Deserialize)]
pub struct AliasRequest {
    pub alias: String,
}

pub async fn add_alias(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AliasRequest>,
) -> Result<StatusCode, ApiError> {
    ctx.with_db(move |conn| Ok(lookups::add_condition_alias(conn, &request.alias, &id)?))
        .await?;
    ctx.core.reload_registry()?;
    Ok(StatusCode::NO_CONTENT)
}
