use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{ApiJson, ApiPath};
use super::validation::{normalize_optional, validate_id, validate_unit_name};
use super::{ApiError, ApiResponse, AppState};
use crate::db::{Unit, UnitInput};

#[derive(Debug, Serialize)]
pub struct UnitDto {
    pub id: i32,
    pub name: String,
    pub code: Option<String>,
    pub campus: Option<String>,
    pub created_at: String,
}

impl From<Unit> for UnitDto {
    fn from(unit: Unit) -> Self {
        Self {
            id: unit.id,
            name: unit.name,
            code: unit.code,
            campus: unit.campus,
            created_at: unit.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UnitRequest {
    pub name: String,
    pub code: Option<String>,
    pub campus: Option<String>,
}

impl UnitRequest {
    fn into_input(self) -> Result<UnitInput, ApiError> {
        Ok(UnitInput {
            name: validate_unit_name(&self.name)?.to_string(),
            code: normalize_optional(self.code),
            campus: normalize_optional(self.campus),
        })
    }
}

/// GET /units
pub async fn list_units(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<UnitDto>>>, ApiError> {
    let units = state.store().list_units().await?;
    Ok(Json(ApiResponse::success(
        units.into_iter().map(UnitDto::from).collect(),
    )))
}

/// GET /units/{id}
pub async fn get_unit(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ApiResponse<UnitDto>>, ApiError> {
    let id = validate_id(id, "unit")?;
    let unit = state
        .store()
        .get_unit(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Unit", id))?;

    Ok(Json(ApiResponse::success(unit.into())))
}

/// POST /units
pub async fn create_unit(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<UnitRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UnitDto>>), ApiError> {
    let unit = state.store().create_unit(payload.into_input()?).await?;

    tracing::info!(unit_id = unit.id, "Unit created");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(unit.into()))))
}

/// PUT /units/{id}
pub async fn update_unit(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<UnitRequest>,
) -> Result<Json<ApiResponse<UnitDto>>, ApiError> {
    let id = validate_id(id, "unit")?;
    let unit = state
        .store()
        .update_unit(id, payload.into_input()?)
        .await?
        .ok_or_else(|| ApiError::not_found("Unit", id))?;

    Ok(Json(ApiResponse::success(unit.into())))
}

/// DELETE /units/{id}
///
/// Fails with 409 while users, printers, items or requisitions still
/// reference the unit.
pub async fn delete_unit(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id, "unit")?;

    if !state.store().delete_unit(id).await? {
        return Err(ApiError::not_found("Unit", id));
    }

    Ok(StatusCode::NO_CONTENT)
}
