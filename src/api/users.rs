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
    normalize_optional, parse_enum, validate_email, validate_id, validate_password,
    validate_required, validate_username,
};
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::db::{NewUser, User, UserChanges, UserFilter};
use crate::domain::Role;

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub unit_id: Option<i32>,
    pub unit_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            phone: user.phone,
            email: user.email,
            unit_id: user.unit_id,
            unit_name: user.unit_name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    /// `technician` matches every technician variant.
    pub role_type: Option<String>,
    pub unit_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub password: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub unit_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub unit_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub username: String,
    pub new_password: String,
}

struct ProfileFields {
    username: String,
    full_name: String,
    phone: Option<String>,
    email: Option<String>,
}

async fn check_profile(
    state: &AppState,
    username: &str,
    full_name: &str,
    phone: Option<String>,
    email: Option<String>,
    unit_id: Option<i32>,
) -> Result<ProfileFields, ApiError> {
    let username = validate_username(username)?.to_string();
    let full_name = validate_required(full_name, "Full name")?.to_string();

    let email = match normalize_optional(email) {
        Some(email) => Some(validate_email(&email)?.to_string()),
        None => None,
    };

    if let Some(unit_id) = unit_id {
        validate_id(unit_id, "unit")?;
        if state.store().get_unit(unit_id).await?.is_none() {
            return Err(ApiError::validation(format!("Unit {unit_id} does not exist")));
        }
    }

    Ok(ProfileFields {
        username,
        full_name,
        phone: normalize_optional(phone),
        email,
    })
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let technicians_only = match query.role_type.as_deref() {
        None | Some("") => false,
        Some("technician") => true,
        Some(other) => {
            return Err(ApiError::validation(format!(
                "Unknown role_type: {other}"
            )));
        }
    };

    let role = match query.role.as_deref() {
        None | Some("") => None,
        Some(role) => Some(parse_enum::<Role>(role)?),
    };

    let filter = UserFilter {
        role,
        technicians_only,
        unit_id: query.unit_id,
    };

    let users = state.store().list_users(&filter).await?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let min_length = state.config().read().await.security.min_password_length;
    validate_password(&payload.password, min_length)?;
    let role = parse_enum::<Role>(&payload.role)?;

    let fields = check_profile(
        &state,
        &payload.username,
        &payload.full_name,
        payload.phone,
        payload.email,
        payload.unit_id,
    )
    .await?;

    let password_hash = state
        .auth_service()
        .hash_password(&payload.password)
        .await?;

    let user = state
        .store()
        .create_user(NewUser {
            username: fields.username,
            full_name: fields.full_name,
            role,
            phone: fields.phone,
            email: fields.email,
            unit_id: payload.unit_id,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User created");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
}

/// PUT /users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let id = validate_id(id, "user")?;
    let role = parse_enum::<Role>(&payload.role)?;

    let fields = check_profile(
        &state,
        &payload.username,
        &payload.full_name,
        payload.phone,
        payload.email,
        payload.unit_id,
    )
    .await?;

    let user = state
        .store()
        .update_user(
            id,
            UserChanges {
                username: fields.username,
                full_name: fields.full_name,
                role,
                phone: fields.phone,
                email: fields.email,
                unit_id: payload.unit_id,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(user.into())))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id(id, "user")?;

    if id == identity.user_id {
        return Err(ApiError::forbidden("You cannot delete your own account"));
    }

    if !state.store().delete_user(id).await? {
        return Err(ApiError::not_found("User", id));
    }

    tracing::info!(user_id = id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /users/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let username = validate_required(&payload.username, "Username")?;

    state
        .auth_service()
        .reset_password(username, &payload.new_password)
        .await?;

    tracing::info!(username, "Password reset");

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password reset successfully",
    ))))
}
