use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{ApiJson, ApiPath};
use super::auth::CurrentUser;
use super::requisitions::StatusRequest;
use super::validation::{normalize_optional, parse_enum, validate_id, validate_required};
use super::{ApiError, ApiResponse, AppState};
use crate::db::{MaintenanceTicket, NewTicket, TicketChange};
use crate::domain::MaintenanceStatus;

#[derive(Debug, Serialize)]
pub struct MaintenanceTicketDto {
    pub id: i32,
    pub ticket_number: Option<String>,
    pub equipment: String,
    pub problem_description: String,
    pub technician_id: i32,
    pub technician_name: Option<String>,
    pub status: MaintenanceStatus,
    pub report: Option<String>,
    pub received_at: String,
    pub updated_at: String,
}

impl From<MaintenanceTicket> for MaintenanceTicketDto {
    fn from(t: MaintenanceTicket) -> Self {
        Self {
            id: t.id,
            ticket_number: t.ticket_number,
            equipment: t.equipment,
            problem_description: t.problem_description,
            technician_id: t.technician_id,
            technician_name: t.technician_name,
            status: t.status,
            report: t.report,
            received_at: t.received_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub ticket_number: Option<String>,
    pub equipment: String,
    pub problem_description: String,
    /// Defaults to the caller.
    pub technician_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct FinishTicketRequest {
    pub report: String,
}

/// GET /maintenance
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<MaintenanceTicketDto>>>, ApiError> {
    let tickets = state.store().list_maintenance().await?;
    Ok(Json(ApiResponse::success(
        tickets.into_iter().map(Into::into).collect(),
    )))
}

/// POST /maintenance
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiJson(payload): ApiJson<CreateTicketRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MaintenanceTicketDto>>), ApiError> {
    let equipment = validate_required(&payload.equipment, "Equipment")?.to_string();
    let problem_description =
        validate_required(&payload.problem_description, "Problem description")?.to_string();

    let technician_id = match payload.technician_id {
        Some(id) => {
            let id = validate_id(id, "technician")?;
            if state.store().get_user(id).await?.is_none() {
                return Err(ApiError::validation(format!("Technician {id} does not exist")));
            }
            id
        }
        None => identity.user_id,
    };

    let ticket = state
        .store()
        .create_maintenance(NewTicket {
            ticket_number: normalize_optional(payload.ticket_number),
            equipment,
            problem_description,
            technician_id,
        })
        .await?;

    tracing::info!(ticket_id = ticket.id, technician_id, "Maintenance ticket opened");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(ticket.into()))))
}

async fn apply(
    state: &AppState,
    id: i32,
    change: TicketChange,
) -> Result<Json<ApiResponse<MaintenanceTicketDto>>, ApiError> {
    let id = validate_id(id, "maintenance ticket")?;
    let ticket = state
        .store()
        .transition_maintenance(id, change)
        .await?
        .ok_or_else(|| ApiError::not_found("Maintenance ticket", id))?;

    Ok(Json(ApiResponse::success(ticket.into())))
}

/// PATCH /maintenance/{id}/status
pub async fn update_ticket_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<StatusRequest>,
) -> Result<Json<ApiResponse<MaintenanceTicketDto>>, ApiError> {
    let status = parse_enum::<MaintenanceStatus>(&payload.status)?;
    apply(&state, id, TicketChange::Status(status)).await
}

/// PATCH /maintenance/{id}/start
///
/// The caller takes the ticket over.
pub async fn start_ticket(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ApiResponse<MaintenanceTicketDto>>, ApiError> {
    apply(
        &state,
        id,
        TicketChange::Start {
            technician_id: identity.user_id,
        },
    )
    .await
}

/// PATCH /maintenance/{id}/finish
pub async fn finish_ticket(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<FinishTicketRequest>,
) -> Result<Json<ApiResponse<MaintenanceTicketDto>>, ApiError> {
    let report = validate_required(&payload.report, "Technical report")?.to_string();
    apply(&state, id, TicketChange::Finish { report }).await
}
