//! HTTP handlers for movement requests and the stock ledger

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::movement::{
    CreateMovementRequestInput, MovementRequest, MovementRequestDetail, MovementService,
    MovementStatus, MovementType, PendingFilters, ReviewInput, UpdateMovementRequestInput,
};
use crate::AppState;
use shared::types::Pagination;

/// Query parameters for listing the caller's own requests
#[derive(Debug, Deserialize)]
pub struct MyRequestsQuery {
    pub status: Option<MovementStatus>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query parameters for the pending-approval queue
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub movement_type: Option<MovementType>,
    pub warehouse_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query parameters for the filtered stock sum
#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
}

/// Filtered stock sum response
#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub stock: i64,
}

fn default_limit() -> i64 {
    100
}

/// A requester may act on their own request; anyone at admin level may act
/// on any request.
fn ensure_creator_or_admin(
    state: &AppState,
    user: &CurrentUser,
    requested_by: Uuid,
) -> AppResult<()> {
    if requested_by != user.0.user_id && !user.0.has_level(state.config.approval.admin_level) {
        return Err(AppError::InsufficientPermissions);
    }
    Ok(())
}

fn ensure_approver(state: &AppState, user: &CurrentUser) -> AppResult<()> {
    if !user.0.has_level(state.config.approval.approver_level) {
        return Err(AppError::InsufficientPermissions);
    }
    Ok(())
}

/// Create a movement request (DRAFT)
pub async fn create_movement_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMovementRequestInput>,
) -> AppResult<(StatusCode, Json<MovementRequestDetail>)> {
    let service = MovementService::new(state.db);
    let detail = service.create_request(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// List the caller's own movement requests
pub async fn list_my_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<MyRequestsQuery>,
) -> AppResult<Json<Vec<MovementRequest>>> {
    let service = MovementService::new(state.db);
    let requests = service
        .list_by_user(
            current_user.0.user_id,
            query.status,
            Pagination { skip: query.skip, limit: query.limit },
        )
        .await?;
    Ok(Json(requests))
}

/// List PENDING requests awaiting review (approver level)
pub async fn list_pending_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<PendingQuery>,
) -> AppResult<Json<Vec<MovementRequest>>> {
    ensure_approver(&state, &current_user)?;

    let service = MovementService::new(state.db.clone());
    let requests = service
        .list_pending(
            PendingFilters {
                movement_type: query.movement_type,
                warehouse_id: query.warehouse_id,
                start_date: query.start_date,
                end_date: query.end_date,
            },
            Pagination { skip: query.skip, limit: query.limit },
        )
        .await?;
    Ok(Json(requests))
}

/// Get a movement request by id (creator or admin)
pub async fn get_movement_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MovementRequestDetail>> {
    let service = MovementService::new(state.db.clone());
    let detail = service.get_request(id).await?;
    ensure_creator_or_admin(&state, &current_user, detail.request.requested_by)?;
    Ok(Json(detail))
}

/// Update a DRAFT movement request (creator or admin)
pub async fn update_movement_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMovementRequestInput>,
) -> AppResult<Json<MovementRequestDetail>> {
    let service = MovementService::new(state.db.clone());
    let detail = service.get_request(id).await?;
    ensure_creator_or_admin(&state, &current_user, detail.request.requested_by)?;

    let detail = service.update_request(id, input).await?;
    Ok(Json(detail))
}

/// Submit a DRAFT request for approval (creator or admin). Validates
/// stock for OUT/TRANSFER without reserving it.
pub async fn submit_movement_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MovementRequestDetail>> {
    let service = MovementService::new(state.db.clone());
    let detail = service.get_request(id).await?;
    ensure_creator_or_admin(&state, &current_user, detail.request.requested_by)?;

    let detail = service.submit(id).await?;
    Ok(Json(detail))
}

/// Approve a PENDING request (approver level)
pub async fn approve_movement_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewInput>,
) -> AppResult<Json<MovementRequestDetail>> {
    ensure_approver(&state, &current_user)?;

    let service = MovementService::new(state.db.clone());
    let detail = service
        .approve(id, current_user.0.user_id, review.notes)
        .await?;
    Ok(Json(detail))
}

/// Reject a PENDING request (approver level, terminal)
pub async fn reject_movement_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(review): Json<ReviewInput>,
) -> AppResult<Json<MovementRequestDetail>> {
    ensure_approver(&state, &current_user)?;

    let service = MovementService::new(state.db.clone());
    let detail = service
        .reject(id, current_user.0.user_id, review.notes)
        .await?;
    Ok(Json(detail))
}

/// Apply an APPROVED request: write the ledger entries (approver level)
pub async fn apply_movement_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MovementRequestDetail>> {
    ensure_approver(&state, &current_user)?;

    let service = MovementService::new(state.db.clone());
    let detail = service.apply(id).await?;
    Ok(Json(detail))
}

/// Cancel a DRAFT request (creator or admin, terminal)
pub async fn cancel_movement_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MovementRequestDetail>> {
    let service = MovementService::new(state.db.clone());
    let detail = service.get_request(id).await?;
    ensure_creator_or_admin(&state, &current_user, detail.request.requested_by)?;

    let detail = service.cancel(id).await?;
    Ok(Json(detail))
}

/// Current stock sum, filtered by product and/or warehouse
pub async fn get_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<StockResponse>> {
    let service = MovementService::new(state.db);
    let stock = service.stock(query.product_id, query.warehouse_id).await?;
    Ok(Json(StockResponse { stock }))
}
