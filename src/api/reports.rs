use axum::{
    Json,
    extract::State,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::ApiQuery;
use super::validation::{validate_date_range, validate_id};
use super::{ApiError, ApiResponse, AppState};
use crate::db::{
    GlobalStats, ItemUsage, ReportLine, ReportRequisition, TechnicianCount, TechnicianReport,
    day_start,
};
use crate::domain::RequisitionStatus;

#[derive(Debug, Serialize)]
pub struct TechnicianCountDto {
    pub technician_id: i32,
    pub technician_name: Option<String>,
    pub total: i64,
}

impl From<TechnicianCount> for TechnicianCountDto {
    fn from(row: TechnicianCount) -> Self {
        Self {
            technician_id: row.technician_id,
            technician_name: row.technician_name,
            total: row.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemUsageDto {
    pub item_id: i32,
    pub description: Option<String>,
    pub total_requested: i64,
}

impl From<ItemUsage> for ItemUsageDto {
    fn from(row: ItemUsage) -> Self {
        Self {
            item_id: row.item_id,
            description: row.description,
            total_requested: row.total_requested,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GlobalStatsDto {
    pub units: u64,
    pub users: u64,
    pub total_item_quantity: i64,
    pub pending_requisitions: u64,
}

impl From<GlobalStats> for GlobalStatsDto {
    fn from(stats: GlobalStats) -> Self {
        Self {
            units: stats.units,
            users: stats.users,
            total_item_quantity: stats.total_item_quantity,
            pending_requisitions: stats.pending_requisitions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportLineDto {
    pub item_id: i32,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
}

#[derive(Debug, Serialize)]
pub struct ReportRequisitionDto {
    pub id: i32,
    pub unit_name: Option<String>,
    pub ticket_number: Option<String>,
    pub status: RequisitionStatus,
    pub created_at: String,
    pub items: Vec<ReportLineDto>,
}

#[derive(Debug, Serialize)]
pub struct TechnicianReportDto {
    pub technician_id: i32,
    pub technician_name: String,
    pub from: String,
    pub to: String,
    pub requisitions: Vec<ReportRequisitionDto>,
    pub total_units: i64,
    pub total_value: f64,
}

impl From<ReportLine> for ReportLineDto {
    fn from(line: ReportLine) -> Self {
        Self {
            item_id: line.item_id,
            description: line.description,
            quantity: line.quantity,
            unit_price: line.unit_price,
        }
    }
}

impl From<ReportRequisition> for ReportRequisitionDto {
    fn from(r: ReportRequisition) -> Self {
        Self {
            id: r.id,
            unit_name: r.unit_name,
            ticket_number: r.ticket_number,
            status: r.status,
            created_at: r.created_at,
            items: r.lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TechnicianReportQuery {
    pub technician_id: i32,
    pub from: String,
    pub to: String,
}

/// GET /reports/requisitions-by-technician
pub async fn requisitions_by_technician(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<TechnicianCountDto>>>, ApiError> {
    let rows = state.store().requisitions_by_technician().await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(Into::into).collect(),
    )))
}

/// GET /reports/top-items
pub async fn top_items(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<ItemUsageDto>>>, ApiError> {
    let rows = state.store().top_items().await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(Into::into).collect(),
    )))
}

/// GET /reports/global-stats
pub async fn global_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<GlobalStatsDto>>, ApiError> {
    let stats = state.store().global_stats().await?;
    Ok(Json(ApiResponse::success(stats.into())))
}

/// GET /reports/technician-detail
///
/// `from` and `to` are inclusive calendar dates (UTC).
pub async fn technician_detail(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TechnicianReportQuery>,
) -> Result<Json<ApiResponse<TechnicianReportDto>>, ApiError> {
    let technician_id = validate_id(query.technician_id, "technician")?;
    let (from, to) = validate_date_range(&query.from, &query.to)?;
    let until = to
        .succ_opt()
        .ok_or_else(|| ApiError::validation("'to' date is out of range"))?;

    let report: TechnicianReport = state
        .store()
        .technician_report(technician_id, &day_start(from), &day_start(until))
        .await?
        .ok_or_else(|| ApiError::not_found("Technician", technician_id))?;

    Ok(Json(ApiResponse::success(TechnicianReportDto {
        technician_id: report.technician_id,
        technician_name: report.technician_name,
        from: from.to_string(),
        to: to.to_string(),
        requisitions: report.requisitions.into_iter().map(Into::into).collect(),
        total_units: report.total_units,
        total_value: report.total_value,
    })))
}
