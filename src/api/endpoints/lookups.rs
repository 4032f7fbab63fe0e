//! Reference data, read from the registry snapshot.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson};
use crate::engine::lookups;
use crate::models::{ContactType, Hospital, NewHospital, Specialization};

pub async fn contact_types(State(ctx): State<ApiContext>) -> Result<Json<Vec<ContactType>>, ApiError> {
    Ok(Json(ctx.core.registry()?.contact_types().to_vec()))
}

pub async fn specializations(State(ctx): State<ApiContext>) -> Result<Json<Vec<Specialization>>, ApiError> {
    Ok(Json(ctx.core.registry()?.specializations().to_vec()))
}

pub async fn hospitals(State(ctx): State<ApiContext>) -> Result<Json<Vec<Hospital>>, ApiError> {
    Ok(Json(ctx.core.registry()?.hospitals().to_vec()))
}

pub async fn create_hospital(
    State(ctx): State<ApiContext>,
    ApiJson(new): ApiJson<NewHospital>,
) -> Result<(StatusCode, Json<Hospital>), ApiError> {
    let hospital = ctx.with_db(move |conn| Ok(lookups::create_hospital(conn, &new)?)).await?;
    ctx.core.reload_registry()?;
    Ok((StatusCode::CREATED, Json(hospital)))
}
