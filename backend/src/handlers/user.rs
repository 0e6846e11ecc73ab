//! HTTP handlers for user and role administration

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::user::{Role, UpdateUserInput, User, UserService};
use crate::AppState;
use shared::types::Pagination;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

fn ensure_admin(state: &AppState, user: &CurrentUser) -> AppResult<()> {
    if !user.0.has_level(state.config.approval.admin_level) {
        return Err(AppError::InsufficientPermissions);
    }
    Ok(())
}

/// List users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<Json<Vec<User>>> {
    ensure_admin(&state, &current_user)?;
    let service = UserService::new(state.db);
    let users = service
        .list(Pagination { skip: query.skip, limit: query.limit })
        .await?;
    Ok(Json(users))
}

/// Get a user by id (admin)
pub async fn get_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    ensure_admin(&state, &current_user)?;
    let service = UserService::new(state.db);
    let user = service.get(id).await?;
    Ok(Json(user))
}

/// Update a user's name, role, or active flag (admin)
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    ensure_admin(&state, &current_user)?;
    let service = UserService::new(state.db);
    let user = service.update(id, input).await?;
    Ok(Json(user))
}

/// List the role ladder
pub async fn list_roles(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Role>>> {
    let service = UserService::new(state.db);
    let roles = service.list_roles().await?;
    Ok(Json(roles))
}
