//! Movement request workflow and stock ledger service
//!
//! Stock truth lives in the append-only `movements` ledger: the balance of
//! a (product, warehouse) pair is always the sum of its signed quantities,
//! never a cached counter. Requests walk a fixed lifecycle
//! (DRAFT -> PENDING -> APPROVED -> COMPLETED, with PENDING -> REJECTED and
//! DRAFT -> CANCELLED as terminal exits) and only `apply` writes the ledger.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::types::Pagination;
use shared::validation::validate_quantity;

/// Movement service for request lifecycle and ledger queries
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
}

/// Movement types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock entering a warehouse (purchase, customer return)
    In,
    /// Stock leaving a warehouse (issue, sale, shrinkage)
    Out,
    /// Stock moving between two warehouses
    Transfer,
    /// Manual correction after a physical count
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Transfer => "TRANSFER",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }

    /// OUT and TRANSFER consume stock, so they must name a source warehouse
    pub fn requires_source(&self) -> bool {
        matches!(self, MovementType::Out | MovementType::Transfer)
    }

    /// IN and TRANSFER deliver stock into a destination warehouse
    pub fn requires_destination(&self) -> bool {
        matches!(self, MovementType::In | MovementType::Transfer)
    }
}

/// Movement request lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Draft => "DRAFT",
            MovementStatus::Pending => "PENDING",
            MovementStatus::Approved => "APPROVED",
            MovementStatus::Rejected => "REJECTED",
            MovementStatus::Completed => "COMPLETED",
            MovementStatus::Cancelled => "CANCELLED",
        }
    }

    /// Legal transition matrix. Transitions are monotonic: once a request
    /// leaves a state there is no path back.
    pub fn can_transition_to(&self, next: MovementStatus) -> bool {
        use MovementStatus::*;
        matches!(
            (self, next),
            (Draft, Pending) | (Draft, Cancelled) | (Pending, Approved) | (Pending, Rejected) | (Approved, Completed)
        )
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MovementStatus::Completed | MovementStatus::Rejected | MovementStatus::Cancelled
        )
    }
}

/// Movement request header
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MovementRequest {
    pub id: Uuid,
    pub movement_type: MovementType,
    pub status: MovementStatus,
    pub requested_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub source_warehouse_id: Option<Uuid>,
    pub destination_warehouse_id: Option<Uuid>,
    pub reason: Option<String>,
    pub approval_notes: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Line item of a movement request. Items are created with the request and
/// never edited afterwards; a new draft replaces a wrong one.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MovementRequestItem {
    pub id: Uuid,
    pub request_id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub quantity: i64,
    pub notes: Option<String>,
}

/// Ledger entry recording an actual stock change. Append-only: corrections
/// are new offsetting entries, never edits.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Movement {
    pub id: Uuid,
    pub movement_request_id: Option<Uuid>,
    pub movement_type: MovementType,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i64,
    pub previous_balance: i64,
    pub new_balance: i64,
    pub created_at: DateTime<Utc>,
}

/// Request header together with its items
#[derive(Debug, Clone, Serialize)]
pub struct MovementRequestDetail {
    #[serde(flatten)]
    pub request: MovementRequest,
    pub items: Vec<MovementRequestItem>,
}

/// Input for creating a movement request
#[derive(Debug, Deserialize)]
pub struct CreateMovementRequestInput {
    pub movement_type: MovementType,
    pub source_warehouse_id: Option<Uuid>,
    pub destination_warehouse_id: Option<Uuid>,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub items: Vec<CreateMovementItemInput>,
}

/// Input for a single request item
#[derive(Debug, Deserialize)]
pub struct CreateMovementItemInput {
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub quantity: i64,
    pub notes: Option<String>,
}

/// Header fields a creator may change while the request is still DRAFT.
/// Fields absent from the patch are left untouched; an explicit null
/// clears the value.
#[derive(Debug, Deserialize)]
pub struct UpdateMovementRequestInput {
    #[serde(default, deserialize_with = "double_option")]
    pub source_warehouse_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub destination_warehouse_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub reason: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub reference: Option<Option<String>>,
}

/// Distinguishes an absent patch field (outer None) from an explicit
/// null (Some(None))
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Optional reviewer notes for approve/reject
#[derive(Debug, Deserialize)]
pub struct ReviewInput {
    pub notes: Option<String>,
}

/// Filters for the pending-approval queue
#[derive(Debug, Default, Deserialize)]
pub struct PendingFilters {
    pub movement_type: Option<MovementType>,
    pub warehouse_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Per-product stock line in a warehouse snapshot
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WarehouseStockEntry {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// One planned ledger write for a request item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedMovement {
    pub warehouse_id: Uuid,
    /// Signed ledger delta: negative for the source leg, positive for the
    /// destination leg
    pub quantity: i64,
    /// The source leg consumes the item's batch counter (destination-side
    /// batch increments are intentionally not produced; this flag is the
    /// extension point if they ever are)
    pub consumes_batch: bool,
}

/// Plan the ledger writes for one item: a negative leg against the source
/// warehouse when one is set, then a positive leg into the destination.
/// A TRANSFER produces both, each balance-checked against its own
/// warehouse at apply time.
pub fn plan_item_movements(
    source_warehouse_id: Option<Uuid>,
    destination_warehouse_id: Option<Uuid>,
    quantity: i64,
) -> Vec<PlannedMovement> {
    let mut legs = Vec::with_capacity(2);
    if let Some(source) = source_warehouse_id {
        legs.push(PlannedMovement {
            warehouse_id: source,
            quantity: -quantity,
            consumes_batch: true,
        });
    }
    if let Some(destination) = destination_warehouse_id {
        legs.push(PlannedMovement {
            warehouse_id: destination,
            quantity,
            consumes_batch: false,
        });
    }
    legs
}

/// Deterministic 64-bit key for the advisory lock serializing the
/// balance-read-then-append critical section of one (warehouse, product)
/// pair. FNV-1a over both UUIDs so every server process derives the same
/// key for the same pair.
pub fn stock_lock_key(warehouse_id: Uuid, product_id: Uuid) -> i64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in warehouse_id
        .as_bytes()
        .iter()
        .chain(product_id.as_bytes().iter())
    {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash as i64
}

/// Advisory lock keys for every (warehouse, product) pair a request
/// touches, sorted and deduplicated. Every apply acquires its locks in
/// this order before touching the ledger, so two applies over
/// overlapping pairs (e.g. opposite transfers of the same product) can
/// never wait on each other in reversed acquisition order.
pub fn request_lock_keys(
    source_warehouse_id: Option<Uuid>,
    destination_warehouse_id: Option<Uuid>,
    product_ids: &[Uuid],
) -> Vec<i64> {
    let mut keys = Vec::with_capacity(product_ids.len() * 2);
    for warehouse_id in source_warehouse_id.iter().chain(destination_warehouse_id.iter()) {
        for product_id in product_ids {
            keys.push(stock_lock_key(*warehouse_id, *product_id));
        }
    }
    keys.sort_unstable();
    keys.dedup();
    keys
}

const REQUEST_COLUMNS: &str = "id, movement_type, status, requested_by, approved_by, \
     source_warehouse_id, destination_warehouse_id, reason, approval_notes, reference, \
     created_at, updated_at";

const ITEM_COLUMNS: &str = "id, request_id, product_id, batch_id, quantity, notes";

const MOVEMENT_COLUMNS: &str = "id, movement_request_id, movement_type, product_id, \
     warehouse_id, quantity, previous_balance, new_balance, created_at";

impl MovementService {
    /// Create a new MovementService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a movement request in DRAFT. Header and items persist
    /// atomically; no stock validation happens here.
    pub async fn create_request(
        &self,
        user_id: Uuid,
        input: CreateMovementRequestInput,
    ) -> AppResult<MovementRequestDetail> {
        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "A movement request needs at least one item".to_string(),
            });
        }
        for item in &input.items {
            validate_quantity(item.quantity).map_err(|msg| AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
            })?;
        }

        let mut tx = self.db.begin().await?;

        let request = sqlx::query_as::<_, MovementRequest>(&format!(
            r#"
            INSERT INTO movement_requests
                (movement_type, status, requested_by, source_warehouse_id,
                 destination_warehouse_id, reason, reference)
            VALUES ($1, 'DRAFT', $2, $3, $4, $5, $6)
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(input.movement_type)
        .bind(user_id)
        .bind(input.source_warehouse_id)
        .bind(input.destination_warehouse_id)
        .bind(&input.reason)
        .bind(&input.reference)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item_in in &input.items {
            let item = sqlx::query_as::<_, MovementRequestItem>(&format!(
                r#"
                INSERT INTO movement_request_items (request_id, product_id, batch_id, quantity, notes)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {ITEM_COLUMNS}
                "#,
            ))
            .bind(request.id)
            .bind(item_in.product_id)
            .bind(item_in.batch_id)
            .bind(item_in.quantity)
            .bind(&item_in.notes)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;

        tracing::info!(request_id = %request.id, movement_type = request.movement_type.as_str(),
            "movement request created");

        Ok(MovementRequestDetail { request, items })
    }

    /// Get a request with its items
    pub async fn get_request(&self, id: Uuid) -> AppResult<MovementRequestDetail> {
        let request = sqlx::query_as::<_, MovementRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM movement_requests WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement request".to_string()))?;

        let items = self.get_items(id).await?;
        Ok(MovementRequestDetail { request, items })
    }

    async fn get_items(&self, request_id: Uuid) -> AppResult<Vec<MovementRequestItem>> {
        let items = sqlx::query_as::<_, MovementRequestItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM movement_request_items WHERE request_id = $1 ORDER BY id",
        ))
        .bind(request_id)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    /// List requests created by a user, optionally filtered by status
    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<MovementStatus>,
        paging: Pagination,
    ) -> AppResult<Vec<MovementRequest>> {
        let paging = paging.clamped();
        let requests = sqlx::query_as::<_, MovementRequest>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM movement_requests
            WHERE requested_by = $1 AND ($2::movement_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#,
        ))
        .bind(user_id)
        .bind(status)
        .bind(paging.skip)
        .bind(paging.limit)
        .fetch_all(&self.db)
        .await?;
        Ok(requests)
    }

    /// List the PENDING approval queue, filtered by type, warehouse
    /// (source or destination) and creation date range
    pub async fn list_pending(
        &self,
        filters: PendingFilters,
        paging: Pagination,
    ) -> AppResult<Vec<MovementRequest>> {
        let paging = paging.clamped();
        let requests = sqlx::query_as::<_, MovementRequest>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM movement_requests
            WHERE status = 'PENDING'
              AND ($1::movement_type IS NULL OR movement_type = $1)
              AND ($2::uuid IS NULL OR source_warehouse_id = $2 OR destination_warehouse_id = $2)
              AND ($3::date IS NULL OR created_at >= $3)
              AND ($4::date IS NULL OR created_at < $4 + INTERVAL '1 day')
            ORDER BY created_at ASC
            OFFSET $5 LIMIT $6
            "#,
        ))
        .bind(filters.movement_type)
        .bind(filters.warehouse_id)
        .bind(filters.start_date)
        .bind(filters.end_date)
        .bind(paging.skip)
        .bind(paging.limit)
        .fetch_all(&self.db)
        .await?;
        Ok(requests)
    }

    /// Update header fields of a DRAFT request
    pub async fn update_request(
        &self,
        id: Uuid,
        input: UpdateMovementRequestInput,
    ) -> AppResult<MovementRequestDetail> {
        let existing = self.get_request(id).await?;
        if existing.request.status != MovementStatus::Draft {
            return Err(AppError::InvalidStateTransition(
                "Only DRAFT requests can be updated".to_string(),
            ));
        }

        let request = sqlx::query_as::<_, MovementRequest>(&format!(
            r#"
            UPDATE movement_requests
            SET source_warehouse_id = CASE WHEN $1 THEN $2 ELSE source_warehouse_id END,
                destination_warehouse_id = CASE WHEN $3 THEN $4 ELSE destination_warehouse_id END,
                reason = CASE WHEN $5 THEN $6 ELSE reason END,
                reference = CASE WHEN $7 THEN $8 ELSE reference END,
                updated_at = now()
            WHERE id = $9
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(input.source_warehouse_id.is_some())
        .bind(input.source_warehouse_id.flatten())
        .bind(input.destination_warehouse_id.is_some())
        .bind(input.destination_warehouse_id.flatten())
        .bind(input.reason.is_some())
        .bind(input.reason.flatten())
        .bind(input.reference.is_some())
        .bind(input.reference.flatten())
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        let items = self.get_items(id).await?;
        Ok(MovementRequestDetail { request, items })
    }

    /// Submit a DRAFT request for approval (DRAFT -> PENDING).
    ///
    /// For OUT/TRANSFER this is a dry-run validation gate: batch counters
    /// and ledger balances are checked but nothing is reserved, so stock
    /// can still move between submit and apply. Apply re-validates.
    pub async fn submit(&self, id: Uuid) -> AppResult<MovementRequestDetail> {
        let detail = self.get_request(id).await?;
        let request = &detail.request;

        if request.status != MovementStatus::Draft {
            return Err(AppError::InvalidStateTransition(
                "Only DRAFT requests can be submitted".to_string(),
            ));
        }

        if request.movement_type.requires_source() {
            let source = request.source_warehouse_id.ok_or_else(|| {
                AppError::ValidationError("Source warehouse is required".to_string())
            })?;

            for item in &detail.items {
                if let Some(batch_id) = item.batch_id {
                    let batch_quantity = sqlx::query_scalar::<_, i64>(
                        "SELECT quantity FROM product_batches WHERE id = $1",
                    )
                    .bind(batch_id)
                    .fetch_optional(&self.db)
                    .await?;

                    match batch_quantity {
                        None => {
                            return Err(AppError::ValidationError(format!(
                                "Batch {} not found for product {}",
                                batch_id, item.product_id
                            )))
                        }
                        Some(available) if available < item.quantity => {
                            return Err(AppError::InsufficientStock(format!(
                                "Insufficient batch stock for product {}. Available: {}, Requested: {}",
                                item.product_id, available, item.quantity
                            )))
                        }
                        Some(_) => {}
                    }
                }

                let balance = self.balance(item.product_id, source).await?;
                if balance < item.quantity {
                    return Err(AppError::InsufficientStock(format!(
                        "Insufficient warehouse stock for product {}. Available: {}, Requested: {}",
                        item.product_id, balance, item.quantity
                    )));
                }
            }
        }

        self.set_status(id, MovementStatus::Pending).await
    }

    /// Approve a PENDING request
    pub async fn approve(
        &self,
        id: Uuid,
        reviewer_id: Uuid,
        notes: Option<String>,
    ) -> AppResult<MovementRequestDetail> {
        self.review(id, reviewer_id, notes, MovementStatus::Approved)
            .await
    }

    /// Reject a PENDING request (terminal)
    pub async fn reject(
        &self,
        id: Uuid,
        reviewer_id: Uuid,
        notes: Option<String>,
    ) -> AppResult<MovementRequestDetail> {
        self.review(id, reviewer_id, notes, MovementStatus::Rejected)
            .await
    }

    async fn review(
        &self,
        id: Uuid,
        reviewer_id: Uuid,
        notes: Option<String>,
        verdict: MovementStatus,
    ) -> AppResult<MovementRequestDetail> {
        let detail = self.get_request(id).await?;
        if detail.request.status != MovementStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "Request must be PENDING to {}",
                if verdict == MovementStatus::Approved {
                    "approve"
                } else {
                    "reject"
                }
            )));
        }

        let request = sqlx::query_as::<_, MovementRequest>(&format!(
            r#"
            UPDATE movement_requests
            SET status = $1, approved_by = $2,
                approval_notes = COALESCE($3, approval_notes),
                updated_at = now()
            WHERE id = $4
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(verdict)
        .bind(reviewer_id)
        .bind(&notes)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        let items = self.get_items(id).await?;
        Ok(MovementRequestDetail { request, items })
    }

    /// Cancel a DRAFT request (terminal). No other state can be cancelled.
    pub async fn cancel(&self, id: Uuid) -> AppResult<MovementRequestDetail> {
        let detail = self.get_request(id).await?;
        if detail.request.status != MovementStatus::Draft {
            return Err(AppError::InvalidStateTransition(
                "Only DRAFT requests can be cancelled".to_string(),
            ));
        }
        self.set_status(id, MovementStatus::Cancelled).await
    }

    /// Apply an APPROVED request: write the ledger entries and decrement
    /// batch counters (APPROVED -> COMPLETED).
    ///
    /// All writes happen in one transaction. Advisory transaction locks for
    /// every (warehouse, product) pair the request touches are taken up
    /// front in sorted key order, so two concurrent applies can never both
    /// read the same balance and both decrement it, and never wait on each
    /// other's locks in reversed order. Any failed check rolls back the
    /// whole request untouched.
    pub async fn apply(&self, id: Uuid) -> AppResult<MovementRequestDetail> {
        let mut tx = self.db.begin().await?;

        // Row lock on the header stops a double-apply of the same request
        let request = sqlx::query_as::<_, MovementRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM movement_requests WHERE id = $1 FOR UPDATE",
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement request".to_string()))?;

        if request.status != MovementStatus::Approved {
            return Err(AppError::InvalidStateTransition(
                "Request must be APPROVED to apply".to_string(),
            ));
        }

        let items = sqlx::query_as::<_, MovementRequestItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM movement_request_items WHERE request_id = $1 ORDER BY id",
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        for key in request_lock_keys(
            request.source_warehouse_id,
            request.destination_warehouse_id,
            &product_ids,
        ) {
            Self::acquire_stock_lock(&mut tx, key).await?;
        }

        for item in &items {
            let legs = plan_item_movements(
                request.source_warehouse_id,
                request.destination_warehouse_id,
                item.quantity,
            );

            for leg in legs {
                let balance = sqlx::query_scalar::<_, i64>(
                    "SELECT COALESCE(SUM(quantity), 0)::bigint FROM movements
                     WHERE warehouse_id = $1 AND product_id = $2",
                )
                .bind(leg.warehouse_id)
                .bind(item.product_id)
                .fetch_one(&mut *tx)
                .await?;

                // The authoritative oversell guard: stock may have moved
                // since submit, so the source leg re-checks inside the lock
                if leg.quantity < 0 && balance < item.quantity {
                    return Err(AppError::InsufficientStock(format!(
                        "Insufficient stock at application time for product {}. Available: {}, Requested: {}",
                        item.product_id, balance, item.quantity
                    )));
                }

                sqlx::query(
                    r#"
                    INSERT INTO movements
                        (movement_request_id, movement_type, product_id, warehouse_id,
                         quantity, previous_balance, new_balance)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(request.id)
                .bind(request.movement_type)
                .bind(item.product_id)
                .bind(leg.warehouse_id)
                .bind(leg.quantity)
                .bind(balance)
                .bind(balance + leg.quantity)
                .execute(&mut *tx)
                .await?;

                if leg.consumes_batch {
                    if let Some(batch_id) = item.batch_id {
                        Self::decrement_batch(&mut tx, batch_id, item.product_id, item.quantity)
                            .await?;
                    }
                }
            }
        }

        let request = sqlx::query_as::<_, MovementRequest>(&format!(
            r#"
            UPDATE movement_requests
            SET status = 'COMPLETED', updated_at = now()
            WHERE id = $1
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(request_id = %id, "movement request applied");

        Ok(MovementRequestDetail { request, items })
    }

    /// Serialize the balance-read-then-append critical section for one
    /// (warehouse, product) pair. Released automatically at commit/rollback.
    async fn acquire_stock_lock(tx: &mut Transaction<'_, Postgres>, key: i64) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Atomically decrement a batch counter, refusing to go negative. Runs
    /// in the apply transaction so the counter and the ledger cannot
    /// diverge on rollback.
    async fn decrement_batch(
        tx: &mut Transaction<'_, Postgres>,
        batch_id: Uuid,
        product_id: Uuid,
        amount: i64,
    ) -> AppResult<()> {
        let updated = sqlx::query(
            "UPDATE product_batches SET quantity = quantity - $1 WHERE id = $2 AND quantity >= $1",
        )
        .bind(amount)
        .bind(batch_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if updated == 0 {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM product_batches WHERE id = $1)",
            )
            .bind(batch_id)
            .fetch_one(&mut **tx)
            .await?;

            if !exists {
                return Err(AppError::NotFound("Batch".to_string()));
            }
            return Err(AppError::InsufficientStock(format!(
                "Insufficient batch stock at application time for product {}",
                product_id
            )));
        }
        Ok(())
    }

    /// Current balance for a (product, warehouse) pair: the sum of all
    /// ledger quantities, computed fresh on every call. Absent rows mean 0.
    pub async fn balance(&self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<i64> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::bigint FROM movements
             WHERE product_id = $1 AND warehouse_id = $2",
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;
        Ok(balance)
    }

    /// Ledger sum filtered by whichever keys are provided. Omitting both
    /// sums the entire ledger; a degenerate call, but intentional.
    pub async fn stock(
        &self,
        product_id: Option<Uuid>,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<i64> {
        let stock = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::bigint FROM movements
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;
        Ok(stock)
    }

    /// Per-product stock snapshot of a warehouse. Zero and negative
    /// aggregates are omitted: the ledger can theoretically dip negative
    /// under a lost race, and the reporting view hides rather than surfaces
    /// that.
    pub async fn warehouse_stock(&self, warehouse_id: Uuid) -> AppResult<Vec<WarehouseStockEntry>> {
        let entries = sqlx::query_as::<_, WarehouseStockEntry>(
            r#"
            SELECT product_id, SUM(quantity)::bigint AS quantity
            FROM movements
            WHERE warehouse_id = $1
            GROUP BY product_id
            HAVING SUM(quantity) > 0
            ORDER BY product_id
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;
        Ok(entries)
    }

    /// Ledger history for a product, newest first
    pub async fn ledger(&self, product_id: Uuid, paging: Pagination) -> AppResult<Vec<Movement>> {
        let paging = paging.clamped();
        let movements = sqlx::query_as::<_, Movement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movements
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2 LIMIT $3
            "#,
        ))
        .bind(product_id)
        .bind(paging.skip)
        .bind(paging.limit)
        .fetch_all(&self.db)
        .await?;
        Ok(movements)
    }

    async fn set_status(&self, id: Uuid, status: MovementStatus) -> AppResult<MovementRequestDetail> {
        let request = sqlx::query_as::<_, MovementRequest>(&format!(
            r#"
            UPDATE movement_requests
            SET status = $1, updated_at = now()
            WHERE id = $2
            RETURNING {REQUEST_COLUMNS}
            "#,
        ))
        .bind(status)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        let items = self.get_items(id).await?;
        Ok(MovementRequestDetail { request, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [MovementStatus; 6] = [
        MovementStatus::Draft,
        MovementStatus::Pending,
        MovementStatus::Approved,
        MovementStatus::Rejected,
        MovementStatus::Completed,
        MovementStatus::Cancelled,
    ];

    #[test]
    fn test_transition_matrix() {
        use MovementStatus::*;

        assert!(Draft.can_transition_to(Pending));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Completed));

        assert!(!Draft.can_transition_to(Approved)); // cannot skip review
        assert!(!Pending.can_transition_to(Cancelled)); // cancel is draft-only
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Completed.can_transition_to(Draft));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for status in ALL_STATUSES {
            if status.is_terminal() {
                for next in ALL_STATUSES {
                    assert!(!status.can_transition_to(next));
                }
            }
        }
    }

    #[test]
    fn test_no_transition_reenters_draft() {
        for status in ALL_STATUSES {
            assert!(!status.can_transition_to(MovementStatus::Draft));
        }
    }

    #[test]
    fn test_movement_type_warehouse_requirements() {
        assert!(!MovementType::In.requires_source());
        assert!(MovementType::In.requires_destination());

        assert!(MovementType::Out.requires_source());
        assert!(!MovementType::Out.requires_destination());

        assert!(MovementType::Transfer.requires_source());
        assert!(MovementType::Transfer.requires_destination());

        assert!(!MovementType::Adjustment.requires_source());
        assert!(!MovementType::Adjustment.requires_destination());
    }

    #[test]
    fn test_plan_in_single_positive_leg() {
        let dest = Uuid::new_v4();
        let legs = plan_item_movements(None, Some(dest), 40);

        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].warehouse_id, dest);
        assert_eq!(legs[0].quantity, 40);
        assert!(!legs[0].consumes_batch);
    }

    #[test]
    fn test_plan_out_single_negative_leg() {
        let source = Uuid::new_v4();
        let legs = plan_item_movements(Some(source), None, 25);

        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].warehouse_id, source);
        assert_eq!(legs[0].quantity, -25);
        assert!(legs[0].consumes_batch);
    }

    #[test]
    fn test_plan_transfer_source_leg_first() {
        let source = Uuid::new_v4();
        let dest = Uuid::new_v4();
        let legs = plan_item_movements(Some(source), Some(dest), 10);

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].warehouse_id, source);
        assert_eq!(legs[0].quantity, -10);
        assert!(legs[0].consumes_batch);
        assert_eq!(legs[1].warehouse_id, dest);
        assert_eq!(legs[1].quantity, 10);
        assert!(!legs[1].consumes_batch);
    }

    #[test]
    fn test_plan_transfer_nets_to_zero() {
        let legs = plan_item_movements(Some(Uuid::new_v4()), Some(Uuid::new_v4()), 17);
        let net: i64 = legs.iter().map(|l| l.quantity).sum();
        assert_eq!(net, 0);
    }

    #[test]
    fn test_plan_no_warehouses_no_legs() {
        assert!(plan_item_movements(None, None, 5).is_empty());
    }

    #[test]
    fn test_stock_lock_key_deterministic() {
        let warehouse = Uuid::new_v4();
        let product = Uuid::new_v4();

        assert_eq!(
            stock_lock_key(warehouse, product),
            stock_lock_key(warehouse, product)
        );
    }

    #[test]
    fn test_stock_lock_key_order_sensitive() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        // (warehouse, product) and (product, warehouse) are different pairs
        assert_ne!(stock_lock_key(a, b), stock_lock_key(b, a));
    }

    #[test]
    fn test_stock_lock_key_distinct_pairs() {
        let warehouse = Uuid::new_v4();
        let product_a = Uuid::new_v4();
        let product_b = Uuid::new_v4();

        assert_ne!(
            stock_lock_key(warehouse, product_a),
            stock_lock_key(warehouse, product_b)
        );
    }

    #[test]
    fn test_request_lock_keys_sorted_and_deduped() {
        let source = Uuid::new_v4();
        let dest = Uuid::new_v4();
        let product = Uuid::new_v4();

        // Same product on two items must not produce duplicate keys
        let keys = request_lock_keys(Some(source), Some(dest), &[product, product]);
        assert_eq!(keys.len(), 2);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_opposite_transfers_lock_in_same_order() {
        let warehouse_a = Uuid::new_v4();
        let warehouse_b = Uuid::new_v4();
        let product = Uuid::new_v4();

        // A transfer A->B and a transfer B->A of the same product must
        // acquire their locks in the same sequence, never reversed
        assert_eq!(
            request_lock_keys(Some(warehouse_a), Some(warehouse_b), &[product]),
            request_lock_keys(Some(warehouse_b), Some(warehouse_a), &[product])
        );
    }

    #[test]
    fn test_update_patch_null_versus_absent() {
        let patch: UpdateMovementRequestInput = serde_json::from_str("{}").unwrap();
        assert!(patch.reason.is_none());
        assert!(patch.source_warehouse_id.is_none());

        let patch: UpdateMovementRequestInput =
            serde_json::from_str(r#"{"reason": null, "source_warehouse_id": null}"#).unwrap();
        assert_eq!(patch.reason, Some(None));
        assert_eq!(patch.source_warehouse_id, Some(None));

        let patch: UpdateMovementRequestInput =
            serde_json::from_str(r#"{"reason": "cycle count correction"}"#).unwrap();
        assert_eq!(patch.reason, Some(Some("cycle count correction".to_string())));
    }
}
