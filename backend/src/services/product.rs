//! Product catalog and batch tracking service

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::types::Pagination;
use shared::validation::{validate_batch_dates, validate_batch_number, validate_quantity, validate_sku};

/// Product service for catalog and batch management
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Product record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: String,
    pub cost: Decimal,
    pub price: Decimal,
    pub min_stock: i64,
    pub has_batch: bool,
    pub has_expiration: bool,
    pub is_active: bool,
}

/// Batch of a product. The quantity field is a standalone running counter
/// consumed by movement applies; it is not derived from the ledger.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductBatch {
    pub id: Uuid,
    pub product_id: Uuid,
    pub batch_number: String,
    pub manufactured_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub quantity: i64,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: String,
    pub cost: Option<Decimal>,
    pub price: Option<Decimal>,
    pub min_stock: Option<i64>,
    pub has_batch: Option<bool>,
    pub has_expiration: Option<bool>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub barcode: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub cost: Option<Decimal>,
    pub price: Option<Decimal>,
    pub min_stock: Option<i64>,
    pub is_active: Option<bool>,
}

/// Input for creating a batch
#[derive(Debug, Deserialize)]
pub struct CreateBatchInput {
    pub batch_number: String,
    pub manufactured_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub quantity: i64,
}

const PRODUCT_COLUMNS: &str = "id, sku, barcode, name, description, category, unit, \
     cost, price, min_stock, has_batch, has_expiration, is_active";

const BATCH_COLUMNS: &str =
    "id, product_id, batch_number, manufactured_date, expiration_date, quantity";

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product
    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        validate_sku(&input.sku).map_err(|msg| AppError::Validation {
            field: "sku".to_string(),
            message: msg.to_string(),
        })?;

        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE sku = $1")
                .bind(&input.sku)
                .fetch_one(&self.db)
                .await?;
        if existing > 0 {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products
                (sku, barcode, name, description, category, unit, cost, price,
                 min_stock, has_batch, has_expiration)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {PRODUCT_COLUMNS}
            "#,
        ))
        .bind(&input.sku)
        .bind(&input.barcode)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .bind(&input.unit)
        .bind(input.cost.unwrap_or(Decimal::ZERO))
        .bind(input.price.unwrap_or(Decimal::ZERO))
        .bind(input.min_stock.unwrap_or(0))
        .bind(input.has_batch.unwrap_or(false))
        .bind(input.has_expiration.unwrap_or(false))
        .fetch_one(&self.db)
        .await?;

        Ok(product)
    }

    /// List products, optionally filtered to active ones
    pub async fn list(&self, active_only: bool, paging: Pagination) -> AppResult<Vec<Product>> {
        let paging = paging.clamped();
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE ($1 = false OR is_active = true)
            ORDER BY sku ASC
            OFFSET $2 LIMIT $3
            "#,
        ))
        .bind(active_only)
        .bind(paging.skip)
        .bind(paging.limit)
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    /// Get a product by id
    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        Ok(product)
    }

    /// Update a product. The SKU is immutable once created.
    pub async fn update(&self, id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET barcode = COALESCE($1, barcode),
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                unit = COALESCE($5, unit),
                cost = COALESCE($6, cost),
                price = COALESCE($7, price),
                min_stock = COALESCE($8, min_stock),
                is_active = COALESCE($9, is_active)
            WHERE id = $10
            RETURNING {PRODUCT_COLUMNS}
            "#,
        ))
        .bind(&input.barcode)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .bind(&input.unit)
        .bind(input.cost)
        .bind(input.price)
        .bind(input.min_stock)
        .bind(input.is_active)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        Ok(product)
    }

    /// Deactivate a product. Products are never hard-deleted because ledger
    /// entries reference them.
    pub async fn deactivate(&self, id: Uuid) -> AppResult<()> {
        let updated = sqlx::query("UPDATE products SET is_active = false WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }

    /// Create a batch for a batch-tracked product
    pub async fn create_batch(
        &self,
        product_id: Uuid,
        input: CreateBatchInput,
    ) -> AppResult<ProductBatch> {
        let product = self.get(product_id).await?;

        if !product.has_batch {
            return Err(AppError::Validation {
                field: "product_id".to_string(),
                message: "Product is not batch-tracked".to_string(),
            });
        }

        validate_batch_number(&input.batch_number).map_err(|msg| AppError::Validation {
            field: "batch_number".to_string(),
            message: msg.to_string(),
        })?;
        validate_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;
        validate_batch_dates(input.manufactured_date, input.expiration_date).map_err(|msg| {
            AppError::Validation {
                field: "expiration_date".to_string(),
                message: msg.to_string(),
            }
        })?;

        // Expiring products must carry an expiration date on every batch
        if product.has_expiration && input.expiration_date.is_none() {
            return Err(AppError::Validation {
                field: "expiration_date".to_string(),
                message: "Expiration date is required for this product".to_string(),
            });
        }

        let batch = sqlx::query_as::<_, ProductBatch>(&format!(
            r#"
            INSERT INTO product_batches
                (product_id, batch_number, manufactured_date, expiration_date, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BATCH_COLUMNS}
            "#,
        ))
        .bind(product_id)
        .bind(&input.batch_number)
        .bind(input.manufactured_date)
        .bind(input.expiration_date)
        .bind(input.quantity)
        .fetch_one(&self.db)
        .await?;

        Ok(batch)
    }

    /// List batches of a product
    pub async fn list_batches(&self, product_id: Uuid) -> AppResult<Vec<ProductBatch>> {
        // 404 on unknown product rather than an empty list
        self.get(product_id).await?;

        let batches = sqlx::query_as::<_, ProductBatch>(&format!(
            r#"
            SELECT {BATCH_COLUMNS}
            FROM product_batches
            WHERE product_id = $1
            ORDER BY expiration_date ASC NULLS LAST, batch_number ASC
            "#,
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;
        Ok(batches)
    }
}
