//! Lead endpoints.
//!
//! - `POST /leads`: intake, condition by id or by free-text label
//! - `GET /leads`, `GET /leads/:id`
//! - `POST /leads/:id/contacted`, `/convert`, `/lost`

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, ApiQuery};
use crate::engine::{leads, LookupRegistry};
use crate::models::enums::LeadStatus;
use crate::models::*;

/// Intake body. Legacy forms send the condition as a label
/// (`"medical_condition": "Glioblastoma"`) and the channel by name.
#[derive(Debug, Deserialize)]
pub struct LeadIntakeRequest {
    #[serde(flatten)]
    pub contact: ContactDetails,
    pub medical_condition_id: Option<Uuid>,
    pub medical_condition: Option<String>,
    pub contact_type_id: Option<Uuid>,
    pub contact_type: Option<String>,
    pub first_contact_date: Option<NaiveDate>,
    pub initial_consult_date: Option<NaiveDate>,
}

impl LeadIntakeRequest {
    /// Resolve labels against the registry snapshot. Ids win over labels.
    pub fn into_intake(self, registry: &LookupRegistry) -> Result<LeadIntake, ApiError> {
        let medical_condition_id = match (self.medical_condition_id, self.medical_condition.as_deref()) {
            (Some(id), _) => id,
            (None, Some(label)) => {
                registry
                    .resolve_condition(label)
                    .ok_or_else(|| {
                        ApiError::validation("medical_condition", format!("unknown medical condition '{label}'"))
                    })?
                    .id
            }
            (None, None) => {
                return Err(ApiError::validation(
                    "medical_condition_id",
                    "a medical condition is required",
                ))
            }
        };

        let contact_type_id = match (self.contact_type_id, self.contact_type.as_deref()) {
            (Some(id), _) => Some(id),
            (None, Some(name)) => Some(
                registry
                    .contact_type_by_name(name)
                    .ok_or_else(|| ApiError::validation("contact_type", format!("unknown contact type '{name}'")))?
                    .id,
            ),
            (None, None) => None,
        };

        Ok(LeadIntake {
            contact: self.contact,
            medical_condition_id,
            contact_type_id,
            first_contact_date: self.first_contact_date,
            initial_consult_date: self.initial_consult_date,
        })
    }
}

/// `POST /api/v1/leads`: a repeated submission returns the same open lead.
pub async fn intake(
    State(ctx): State<ApiContext>,
    ApiJson(request): ApiJson<LeadIntakeRequest>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let registry = ctx.core.registry()?;
    let intake = request.into_intake(&registry)?;
    let lead = ctx.with_db(move |conn| Ok(leads::intake_lead(conn, &intake)?)).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadListQuery {
    pub status: Option<LeadStatus>,
    pub medical_condition_id: Option<Uuid>,
    pub person_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<LeadListQuery>,
) -> Result<Json<Page<Lead>>, ApiError> {
    let page = PageRequest::new(query.page, query.page_size);
    let filter = LeadFilter {
        status: query.status,
        medical_condition_id: query.medical_condition_id,
        person_id: query.person_id,
    };
    let leads = ctx.with_db(move |conn| Ok(leads::list_leads(conn, &filter, page)?)).await?;
    Ok(Json(leads))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Lead>, ApiError> {
    let lead = ctx.with_db(move |conn| Ok(leads::get_lead(conn, &id)?)).await?;
    Ok(Json(lead))
}

pub async fn contacted(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Lead>, ApiError> {
    let lead = ctx.with_db(move |conn| Ok(leads::mark_contacted(conn, &id)?)).await?;
    Ok(Json(lead))
}

/// `POST /api/v1/leads/:id/convert`: returns the linked Patient.
pub async fn convert(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    let patient = ctx.with_db(move |conn| Ok(leads::convert_lead(conn, &id)?)).await?;
    Ok(Json(patient))
}

#[derive(Debug, Default, Deserialize)]
pub struct LostRequest {
    pub reason: Option<String>,
}

/// `POST /api/v1/leads/:id/lost`: the body is optional.
pub async fn lost(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<LostRequest>>,
) -> Result<Json<Lead>, ApiError> {
    let reason = body.and_then(|ApiJson(b)| b.reason);
    let lead = ctx
        .with_db(move |conn| Ok(leads::mark_lost(conn, &id, reason.as_deref())?))
        .await?;
    Ok(Json(lead))
}
