use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::auth::CurrentUser;
use super::validation::{normalize_optional, parse_enum, validate_id};
use super::{ApiError, ApiResponse, AppState};
use crate::db::{RequisitionDetail, RequisitionFilter, RequisitionLine, RequisitionSummary};
use crate::domain::{Capability, DeliveryStatus, RequisitionStatus};
use crate::services::RequisitionRequest;

#[derive(Debug, Serialize)]
pub struct RequisitionDto {
    pub id: i32,
    pub requester_id: i32,
    pub requester_name: Option<String>,
    pub technician_id: i32,
    pub technician_name: Option<String>,
    pub unit_id: i32,
    pub unit_name: Option<String>,
    pub equipment_sector: Option<String>,
    pub ticket_number: Option<String>,
    pub asset_tag: Option<String>,
    pub status: RequisitionStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<RequisitionSummary> for RequisitionDto {
    fn from(r: RequisitionSummary) -> Self {
        Self {
            id: r.id,
            requester_id: r.requester_id,
            requester_name: r.requester_name,
            technician_id: r.technician_id,
            technician_name: r.technician_name,
            unit_id: r.unit_id,
            unit_name: r.unit_name,
            equipment_sector: r.equipment_sector,
            ticket_number: r.ticket_number,
            asset_tag: r.asset_tag,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequisitionLineDto {
    pub id: i32,
    pub requisition_id: i32,
    pub item_id: i32,
    pub item_description: Option<String>,
    pub unit_of_measure: Option<String>,
    pub quantity_requested: i32,
    pub delivery_status: DeliveryStatus,
    pub delivered_at: Option<String>,
}

impl From<RequisitionLine> for RequisitionLineDto {
    fn from(line: RequisitionLine) -> Self {
        Self {
            id: line.id,
            requisition_id: line.requisition_id,
            item_id: line.item_id,
            item_description: line.item_description,
            unit_of_measure: line.unit_of_measure,
            quantity_requested: line.quantity_requested,
            delivery_status: line.delivery_status,
            delivered_at: line.delivered_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequisitionDetailDto {
    #[serde(flatten)]
    pub requisition: RequisitionDto,
    pub items: Vec<RequisitionLineDto>,
}

impl From<RequisitionDetail> for RequisitionDetailDto {
    fn from(detail: RequisitionDetail) -> Self {
        Self {
            requisition: detail.requisition.into(),
            items: detail.lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RequisitionListQuery {
    pub unit_id: Option<i32>,
    pub status: Option<String>,
    pub technician_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RequisitionItemRequest {
    pub item_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequisitionRequest {
    pub technician_id: i32,
    pub unit_id: i32,
    pub equipment_sector: Option<String>,
    pub ticket_number: Option<String>,
    pub asset_tag: Option<String>,
    #[serde(default)]
    pub items: Vec<RequisitionItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// GET /requisitions
pub async fn list_requisitions(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RequisitionListQuery>,
) -> Result<Json<ApiResponse<Vec<RequisitionDto>>>, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(status) => Some(parse_enum::<RequisitionStatus>(status)?),
    };

    let filter = RequisitionFilter {
        unit_id: query.unit_id,
        status,
        technician_id: query.technician_id,
        limit: None,
    };

    let requisitions = state.requisition_service().list(&filter).await?;

    Ok(Json(ApiResponse::success(
        requisitions.into_iter().map(Into::into).collect(),
    )))
}

/// GET /requisitions/latest
pub async fn latest_requisitions(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<ApiResponse<Vec<RequisitionDto>>>, ApiError> {
    let requisitions = state.requisition_service().latest(&identity).await?;

    Ok(Json(ApiResponse::success(
        requisitions.into_iter().map(Into::into).collect(),
    )))
}

/// GET /requisitions/{id}
pub async fn get_requisition(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ApiResponse<RequisitionDetailDto>>, ApiError> {
    let id = validate_id(id, "requisition")?;
    let detail = state.requisition_service().get(id).await?;
    Ok(Json(ApiResponse::success(detail.into())))
}

/// POST /requisitions
///
/// Draws the requested quantities from item stock. Either every line is
/// covered and recorded, or nothing changes.
pub async fn create_requisition(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(payload): ApiJson<CreateRequisitionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RequisitionDetailDto>>), ApiError> {
    user.require(Capability::CreateRequisition)?;

    let request = RequisitionRequest {
        technician_id: validate_id(payload.technician_id, "technician")?,
        unit_id: validate_id(payload.unit_id, "unit")?,
        equipment_sector: normalize_optional(payload.equipment_sector),
        ticket_number: normalize_optional(payload.ticket_number),
        asset_tag: normalize_optional(payload.asset_tag),
        lines: payload
            .items
            .iter()
            .map(|line| (line.item_id, line.quantity))
            .collect(),
    };

    let detail = state.requisition_service().create(&user.0, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(detail.into())),
    ))
}

/// PATCH /requisitions/{id}/status
pub async fn update_requisition_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<StatusRequest>,
) -> Result<Json<ApiResponse<RequisitionDetailDto>>, ApiError> {
    let id = validate_id(id, "requisition")?;
    let status = parse_enum::<RequisitionStatus>(&payload.status)?;

    let detail = state
        .requisition_service()
        .update_status(id, status)
        .await?;

    Ok(Json(ApiResponse::success(detail.into())))
}

/// PATCH /requisitions/items/{id}/status
pub async fn update_line_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<StatusRequest>,
) -> Result<Json<ApiResponse<RequisitionLineDto>>, ApiError> {
    let id = validate_id(id, "requisition item")?;
    let status = parse_enum::<DeliveryStatus>(&payload.status)?;

    let line = state
        .requisition_service()
        .update_line_status(id, status)
        .await?;

    Ok(Json(ApiResponse::success(line.into())))
}
