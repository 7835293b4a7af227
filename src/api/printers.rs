//! Printers, their consumable supplies and service history.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::auth::CurrentUser;
use super::validation::{normalize_optional, validate_id, validate_ip, validate_required};
use super::{ApiError, ApiResponse, AppState};
use crate::db::{
    ConsumptionRecord, NewServiceRecord, Printer, PrinterFilter, PrinterInput, ServiceRecord,
    StockLevels,
};
use crate::domain::{Capability, Identity, SupplyCounts};
use crate::services::ConsumptionRequest;

#[derive(Debug, Serialize)]
pub struct PrinterDto {
    pub id: i32,
    pub name: String,
    pub serial_number: String,
    pub ip: String,
    pub model: Option<String>,
    pub location: Option<String>,
    pub unit_id: Option<i32>,
    pub unit_name: Option<String>,
    pub policies_applied: bool,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Printer> for PrinterDto {
    fn from(p: Printer) -> Self {
        Self {
            id: p.id,
            name: p.name,
            serial_number: p.serial_number,
            ip: p.ip,
            model: p.model,
            location: p.location,
            unit_id: p.unit_id,
            unit_name: p.unit_name,
            policies_applied: p.policies_applied,
            active: p.active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StockDto {
    #[serde(flatten)]
    pub counts: SupplyCounts,
    pub updated_at: String,
}

impl From<StockLevels> for StockDto {
    fn from(levels: StockLevels) -> Self {
        Self {
            counts: levels.counts,
            updated_at: levels.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConsumptionDto {
    pub id: i32,
    pub printer_id: i32,
    pub printer_name: Option<String>,
    pub technician_id: i32,
    pub technician_name: Option<String>,
    pub unit_id: Option<i32>,
    #[serde(flatten)]
    pub counts: SupplyCounts,
    pub notes: Option<String>,
    pub created_at: String,
}

impl From<ConsumptionRecord> for ConsumptionDto {
    fn from(r: ConsumptionRecord) -> Self {
        Self {
            id: r.id,
            printer_id: r.printer_id,
            printer_name: r.printer_name,
            technician_id: r.technician_id,
            technician_name: r.technician_name,
            unit_id: r.unit_id,
            counts: r.counts,
            notes: r.notes,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceRecordDto {
    pub id: i32,
    pub printer_id: i32,
    pub printer_name: Option<String>,
    pub unit_id: Option<i32>,
    pub technician_id: Option<i32>,
    pub description: String,
    pub created_at: String,
}

impl From<ServiceRecord> for ServiceRecordDto {
    fn from(r: ServiceRecord) -> Self {
        Self {
            id: r.id,
            printer_id: r.printer_id,
            printer_name: r.printer_name,
            unit_id: r.unit_id,
            technician_id: r.technician_id,
            description: r.description,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PrinterListQuery {
    pub ip: Option<String>,
    pub serial_number: Option<String>,
    pub unit_id: Option<i32>,
    pub policies_applied: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PrinterRequest {
    pub name: String,
    pub serial_number: String,
    pub ip: String,
    pub model: Option<String>,
    pub location: Option<String>,
    pub unit_id: Option<i32>,
    #[serde(default)]
    pub policies_applied: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConsumptionListQuery {
    pub unit_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ConsumeRequest {
    pub printer_id: i32,
    #[serde(flatten)]
    pub counts: SupplyCounts,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceListQuery {
    pub printer_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub printer_id: i32,
    pub description: String,
}

/// The unit a caller's listing is restricted to: `requested` for callers
/// who see every unit, otherwise their own. The outer `None` means the
/// caller has no unit and sees nothing.
const fn visible_unit(identity: &Identity, requested: Option<i32>) -> Option<Option<i32>> {
    if identity.can(Capability::ViewAllUnits) {
        Some(requested)
    } else {
        match identity.unit_id {
            Some(unit_id) => Some(Some(unit_id)),
            None => None,
        }
    }
}

async fn to_input(state: &AppState, payload: PrinterRequest) -> Result<PrinterInput, ApiError> {
    let name = validate_required(&payload.name, "Name")?.to_string();
    let serial_number = validate_required(&payload.serial_number, "Serial number")?.to_string();
    let ip = validate_ip(&payload.ip)?.to_string();

    if let Some(unit_id) = payload.unit_id {
        validate_id(unit_id, "unit")?;
        if state.store().get_unit(unit_id).await?.is_none() {
            return Err(ApiError::validation(format!("Unit {unit_id} does not exist")));
        }
    }

    Ok(PrinterInput {
        name,
        serial_number,
        ip,
        model: normalize_optional(payload.model),
        location: normalize_optional(payload.location),
        unit_id: payload.unit_id,
        policies_applied: payload.policies_applied,
    })
}

// ============================================================================
// Printers
// ============================================================================

/// GET /printers/printers
pub async fn list_printers(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiQuery(query): ApiQuery<PrinterListQuery>,
) -> Result<Json<ApiResponse<Vec<PrinterDto>>>, ApiError> {
    let Some(unit_id) = visible_unit(&identity, query.unit_id) else {
        return Ok(Json(ApiResponse::success(Vec::new())));
    };

    let filter = PrinterFilter {
        ip: normalize_optional(query.ip),
        serial_number: normalize_optional(query.serial_number),
        unit_id,
        policies_applied: query.policies_applied,
    };

    let printers = state.store().list_printers(&filter).await?;

    Ok(Json(ApiResponse::success(
        printers.into_iter().map(Into::into).collect(),
    )))
}

/// POST /printers/printers
pub async fn create_printer(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(payload): ApiJson<PrinterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PrinterDto>>), ApiError> {
    user.require(Capability::ManagePrinters)?;

    let input = to_input(&state, payload).await?;
    let printer = state.store().create_printer(input).await?;

    tracing::info!(printer_id = printer.id, "Printer registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(printer.into())),
    ))
}

/// PUT /printers/printers/{id}
pub async fn update_printer(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<PrinterRequest>,
) -> Result<Json<ApiResponse<PrinterDto>>, ApiError> {
    user.require(Capability::ManagePrinters)?;
    let id = validate_id(id, "printer")?;

    let input = to_input(&state, payload).await?;
    let printer = state
        .store()
        .update_printer(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("Printer", id))?;

    Ok(Json(ApiResponse::success(printer.into())))
}

/// DELETE /printers/printers/{id}
///
/// Soft delete: the printer stays referenced by its history.
pub async fn delete_printer(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    user.require(Capability::ManagePrinters)?;
    let id = validate_id(id, "printer")?;

    if !state.store().deactivate_printer(id).await? {
        return Err(ApiError::not_found("Printer", id));
    }

    tracing::info!(printer_id = id, "Printer deactivated");

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Supplies
// ============================================================================

/// GET /printers/supplies
pub async fn list_consumptions(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiQuery(query): ApiQuery<ConsumptionListQuery>,
) -> Result<Json<ApiResponse<Vec<ConsumptionDto>>>, ApiError> {
    let Some(unit_id) = visible_unit(&identity, query.unit_id) else {
        return Ok(Json(ApiResponse::success(Vec::new())));
    };

    let records = state.supply_inventory().list_consumptions(unit_id).await?;

    Ok(Json(ApiResponse::success(
        records.into_iter().map(Into::into).collect(),
    )))
}

/// POST /printers/supplies
pub async fn consume_supplies(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiJson(payload): ApiJson<ConsumeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ConsumptionDto>>), ApiError> {
    let printer_id = validate_id(payload.printer_id, "printer")?;

    let record = state
        .supply_inventory()
        .consume(
            identity.user_id,
            ConsumptionRequest {
                printer_id,
                counts: payload.counts,
                notes: normalize_optional(payload.notes),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(record.into()))))
}

/// GET /printers/stock
pub async fn get_stock(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StockDto>>, ApiError> {
    let levels = state.supply_inventory().current().await?;
    Ok(Json(ApiResponse::success(levels.into())))
}

/// PUT /printers/stock
///
/// Adds the given amounts to the current stock.
pub async fn restock(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(delta): ApiJson<SupplyCounts>,
) -> Result<Json<ApiResponse<StockDto>>, ApiError> {
    user.require(Capability::RestockSupplies)?;

    let levels = state.supply_inventory().restock(delta).await?;
    Ok(Json(ApiResponse::success(levels.into())))
}

// ============================================================================
// Service records
// ============================================================================

/// GET /printers/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ServiceListQuery>,
) -> Result<Json<ApiResponse<Vec<ServiceRecordDto>>>, ApiError> {
    let records = state.store().list_printer_services(query.printer_id).await?;
    Ok(Json(ApiResponse::success(
        records.into_iter().map(Into::into).collect(),
    )))
}

/// POST /printers/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiJson(payload): ApiJson<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ServiceRecordDto>>), ApiError> {
    let printer_id = validate_id(payload.printer_id, "printer")?;
    let description = validate_required(&payload.description, "Description")?.to_string();

    let printer = state
        .store()
        .get_printer(printer_id)
        .await?
        .filter(|p| p.active)
        .ok_or_else(|| ApiError::validation(format!("Printer {printer_id} does not exist")))?;

    let mut record = state
        .store()
        .create_printer_service(NewServiceRecord {
            printer_id,
            unit_id: printer.unit_id,
            technician_id: Some(identity.user_id),
            description,
        })
        .await?;
    record.printer_name = Some(printer.name);

    Ok((StatusCode::CREATED, Json(ApiResponse::success(record.into()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn identity(role: Role, unit_id: Option<i32>) -> Identity {
        Identity {
            user_id: 1,
            role,
            unit_id,
        }
    }

    #[test]
    fn test_visible_unit() {
        assert_eq!(visible_unit(&identity(Role::Admin, None), None), Some(None));
        assert_eq!(
            visible_unit(&identity(Role::Admin, Some(2)), Some(5)),
            Some(Some(5))
        );
        assert_eq!(
            visible_unit(&identity(Role::Manager, Some(2)), Some(5)),
            Some(Some(2))
        );
        assert_eq!(visible_unit(&identity(Role::Technician, None), None), None);
    }
}
