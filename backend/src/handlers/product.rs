//! HTTP handlers for the product catalog and batches

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::movement::{Movement, MovementService};
use crate::services::product::{
    CreateBatchInput, CreateProductInput, Product, ProductBatch, ProductService,
    UpdateProductInput,
};
use crate::AppState;
use shared::types::Pagination;

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    #[serde(default)]
    pub active_only: bool,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
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

/// Create a product (admin)
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    ensure_admin(&state, &current_user)?;
    let service = ProductService::new(state.db);
    let product = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.db);
    let products = service
        .list(query.active_only, Pagination { skip: query.skip, limit: query.limit })
        .await?;
    Ok(Json(products))
}

/// Get a product by id
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.get(id).await?;
    Ok(Json(product))
}

/// Update a product (admin)
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    ensure_admin(&state, &current_user)?;
    let service = ProductService::new(state.db);
    let product = service.update(id, input).await?;
    Ok(Json(product))
}

/// Deactivate a product (admin)
pub async fn deactivate_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    ensure_admin(&state, &current_user)?;
    let service = ProductService::new(state.db);
    service.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a batch for a product (admin)
pub async fn create_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<(StatusCode, Json<ProductBatch>)> {
    ensure_admin(&state, &current_user)?;
    let service = ProductService::new(state.db);
    let batch = service.create_batch(id, input).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// List batches of a product
pub async fn list_batches(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<ProductBatch>>> {
    let service = ProductService::new(state.db);
    let batches = service.list_batches(id).await?;
    Ok(Json(batches))
}

/// Ledger history of a product, newest first
pub async fn get_product_ledger(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<Vec<Movement>>> {
    let service = MovementService::new(state.db);
    let movements = service
        .ledger(id, Pagination { skip: query.skip, limit: query.limit })
        .await?;
    Ok(Json(movements))
}
