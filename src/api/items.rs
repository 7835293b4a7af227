use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::auth::CurrentUser;
use super::validation::{
    normalize_optional, validate_id, validate_price, validate_quantity, validate_required,
};
use super::{ApiError, ApiResponse, AppState};
use crate::db::{Item, ItemInput};
use crate::domain::Capability;

#[derive(Debug, Serialize)]
pub struct ItemDto {
    pub id: i32,
    pub catalog_code: Option<String>,
    pub procurement_ref: Option<String>,
    pub description: String,
    pub kind: Option<String>,
    pub unit_of_measure: String,
    pub storage_location: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
    pub unit_id: i32,
    pub unit_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Item> for ItemDto {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            catalog_code: item.catalog_code,
            procurement_ref: item.procurement_ref,
            description: item.description,
            kind: item.kind,
            unit_of_measure: item.unit_of_measure,
            storage_location: item.storage_location,
            quantity: item.quantity,
            unit_price: item.unit_price,
            unit_id: item.unit_id,
            unit_name: item.unit_name,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ItemListQuery {
    pub unit_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub catalog_code: Option<String>,
    pub procurement_ref: Option<String>,
    pub description: String,
    pub kind: Option<String>,
    pub unit_of_measure: String,
    pub storage_location: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub unit_price: f64,
    pub unit_id: i32,
}

async fn to_input(state: &AppState, payload: ItemRequest) -> Result<ItemInput, ApiError> {
    let description = validate_required(&payload.description, "Description")?.to_string();
    let unit_of_measure =
        validate_required(&payload.unit_of_measure, "Unit of measure")?.to_string();
    let quantity = validate_quantity(payload.quantity)?;
    let unit_price = validate_price(payload.unit_price)?;
    let unit_id = validate_id(payload.unit_id, "unit")?;

    if state.store().get_unit(unit_id).await?.is_none() {
        return Err(ApiError::validation(format!("Unit {unit_id} does not exist")));
    }

    Ok(ItemInput {
        catalog_code: normalize_optional(payload.catalog_code),
        procurement_ref: normalize_optional(payload.procurement_ref),
        description,
        kind: normalize_optional(payload.kind),
        unit_of_measure,
        storage_location: normalize_optional(payload.storage_location),
        quantity,
        unit_price,
        unit_id,
    })
}

/// GET /items
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ItemListQuery>,
) -> Result<Json<ApiResponse<Vec<ItemDto>>>, ApiError> {
    let items = state.store().list_items(query.unit_id).await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(ItemDto::from).collect(),
    )))
}

/// GET /items/{id}
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    let id = validate_id(id, "item")?;
    let item = state
        .store()
        .get_item(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item", id))?;

    Ok(Json(ApiResponse::success(item.into())))
}

/// POST /items
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(payload): ApiJson<ItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ItemDto>>), ApiError> {
    user.require(Capability::ManageItems)?;

    let input = to_input(&state, payload).await?;
    let item = state.store().create_item(input).await?;

    tracing::info!(item_id = item.id, quantity = item.quantity, "Item created");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(item.into()))))
}

/// PUT /items/{id}
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ItemRequest>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    user.require(Capability::ManageItems)?;
    let id = validate_id(id, "item")?;

    let input = to_input(&state, payload).await?;
    let item = state
        .store()
        .update_item(id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("Item", id))?;

    Ok(Json(ApiResponse::success(item.into())))
}

/// DELETE /items/{id}
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    user.require(Capability::ManageItems)?;
    let id = validate_id(id, "item")?;

    if !state.store().delete_item(id).await? {
        return Err(ApiError::not_found("Item", id));
    }

    Ok(StatusCode::NO_CONTENT)
}
