//! Person endpoints.
//!
//! - `POST /persons`: resolve by email or create
//! - `GET /persons`, `GET /persons/:id`
//! - `PUT /persons/:id`: partial update, email moves checked for conflicts
//! - `DELETE /persons/:id`: soft delete
//! - `GET /persons/:id/roles`: active roles, or full history with `?history=true`
//! - `POST /persons/:id/roles`, `DELETE /persons/:id/roles/:role_type`

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, ApiQuery};
use crate::db::repository::now;
use crate::engine::{identity, roles};
use crate::models::enums::RoleType;
use crate::models::datetime::deserialize_optional;
use crate::models::*;

/// `POST /api/v1/persons`: the Person owning the email, refreshed, or a new one.
pub async fn create(
    State(ctx): State<ApiContext>,
    ApiJson(contact): ApiJson<ContactDetails>,
) -> Result<(StatusCode, Json<Person>), ApiError> {
    let person = ctx
        .with_db(move |conn| Ok(identity::resolve_or_create(conn, &contact)?))
        .await?;
    Ok((StatusCode::CREATED, Json(person)))
}

#[derive(Debug, Default, Deserialize)]
pub struct PersonListQuery {
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<PersonListQuery>,
) -> Result<Json<Page<Person>>, ApiError> {
    let page = PageRequest::new(query.page, query.page_size);
    let filter = PersonFilter { is_active: query.is_active };
    let persons = ctx
        .with_db(move |conn| Ok(identity::list_persons(conn, &filter, page)?))
        .await?;
    Ok(Json(persons))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Person>, ApiError> {
    let person = ctx.with_db(move |conn| Ok(identity::get_person(conn, &id)?)).await?;
    Ok(Json(person))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<PersonUpdate>,
) -> Result<Json<Person>, ApiError> {
    let person = ctx
        .with_db(move |conn| Ok(identity::update_person(conn, &id, &update)?))
        .await?;
    Ok(Json(person))
}

pub async fn deactivate(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Person>, ApiError> {
    let person = ctx.with_db(move |conn| Ok(identity::deactivate_person(conn, &id)?)).await?;
    Ok(Json(person))
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    #[serde(default)]
    pub history: bool,
    pub role_type: Option<RoleType>,
}

pub async fn roles(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<RoleQuery>,
) -> Result<Json<Vec<RoleAssignment>>, ApiError> {
    let assignments = ctx
        .with_db(move |conn| {
            if query.history {
                Ok(roles::role_history(conn, &id, query.role_type)?)
            } else {
                let mut active = roles::active_roles(conn, &id)?;
                if let Some(role_type) = query.role_type {
                    active.retain(|r| r.role_type == role_type);
                }
                Ok(active)
            }
        })
        .await?;
    Ok(Json(assignments))
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_type: RoleType,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub effective_from: Option<NaiveDateTime>,
}

/// `POST /api/v1/persons/:id/roles`: supersedes the active row of that type.
pub async fn assign_role(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AssignRoleRequest>,
) -> Result<(StatusCode, Json<RoleAssignment>), ApiError> {
    let effective_from = request.effective_from.unwrap_or_else(now);
    let assignment = ctx
        .with_db(move |conn| Ok(roles::assign_role(conn, &id, request.role_type, effective_from)?))
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// `DELETE /api/v1/persons/:id/roles/:role_type`: 204 whether or not a role
/// was active. Only an unknown Person is a 404.
pub async fn end_role(
    State(ctx): State<ApiContext>,
    ApiPath((id, role_type)): ApiPath<(Uuid, RoleType)>,
) -> Result<StatusCode, ApiError> {
    ctx.with_db(move |conn| {
        identity::get_person(conn, &id)?;
        if !roles::end_role(conn, &id, role_type, now())? {
            tracing::debug!(person_id = %id, %role_type, "No active role to end");
        }
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
