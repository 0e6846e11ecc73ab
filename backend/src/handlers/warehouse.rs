//! HTTP handlers for warehouses, storage locations, and stock snapshots

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::movement::{MovementService, WarehouseStockEntry};
use crate::services::warehouse::{
    CreateLocationInput, CreateWarehouseInput, Location, UpdateWarehouseInput, Warehouse,
    WarehouseService,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListWarehousesQuery {
    #[serde(default)]
    pub active_only: bool,
}

fn ensure_admin(state: &AppState, user: &CurrentUser) -> AppResult<()> {
    if !user.0.has_level(state.config.approval.admin_level) {
        return Err(AppError::InsufficientPermissions);
    }
    Ok(())
}

/// Create a warehouse (admin)
pub async fn create_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    ensure_admin(&state, &current_user)?;
    let service = WarehouseService::new(state.db);
    let warehouse = service.create(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// List warehouses
pub async fn list_warehouses(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListWarehousesQuery>,
) -> AppResult<Json<Vec<Warehouse>>> {
    let service = WarehouseService::new(state.db);
    let warehouses = service.list(query.active_only).await?;
    Ok(Json(warehouses))
}

/// Get a warehouse by id
pub async fn get_warehouse(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.get(id).await?;
    Ok(Json(warehouse))
}

/// Update a warehouse (admin)
pub async fn update_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    ensure_admin(&state, &current_user)?;
    let service = WarehouseService::new(state.db);
    let warehouse = service.update(id, input).await?;
    Ok(Json(warehouse))
}

/// Per-product stock snapshot of a warehouse (positive balances only)
pub async fn get_warehouse_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<WarehouseStockEntry>>> {
    // 404 on unknown warehouse rather than an empty snapshot
    WarehouseService::new(state.db.clone()).get(id).await?;

    let service = MovementService::new(state.db);
    let entries = service.warehouse_stock(id).await?;
    Ok(Json(entries))
}

/// Create a storage location in a warehouse (admin)
pub async fn create_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateLocationInput>,
) -> AppResult<(StatusCode, Json<Location>)> {
    ensure_admin(&state, &current_user)?;
    let service = WarehouseService::new(state.db);
    let location = service.create_location(id, input).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// List the location tree of a warehouse
pub async fn list_locations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Location>>> {
    let service = WarehouseService::new(state.db);
    let locations = service.list_locations(id).await?;
    Ok(Json(locations))
}
