//! Warehouse and storage location service
//!
//! Locations form a tree per warehouse (zones, racks, bins). Only the
//! parent link is stored; the human-readable path is computed on read with
//! a recursive query, so renaming a location can never leave descendants
//! with a stale path.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::validation::validate_code;

/// Warehouse service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Warehouse record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Warehouse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub location: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
}

/// Storage location inside a warehouse, with its computed path
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Location {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub parent_location_id: Option<Uuid>,
    pub code: String,
    pub name: String,
    /// Slash-joined codes from the root, e.g. "/ZONE-A/RACK-3/BIN-12"
    pub path: String,
}

/// Input for creating a warehouse
#[derive(Debug, Deserialize)]
pub struct CreateWarehouseInput {
    pub code: String,
    pub name: String,
    pub location: Option<String>,
}

/// Input for updating a warehouse
#[derive(Debug, Deserialize)]
pub struct UpdateWarehouseInput {
    pub name: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

/// Input for creating a storage location
#[derive(Debug, Deserialize)]
pub struct CreateLocationInput {
    pub parent_location_id: Option<Uuid>,
    pub code: String,
    pub name: String,
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a warehouse
    pub async fn create(
        &self,
        created_by: Uuid,
        input: CreateWarehouseInput,
    ) -> AppResult<Warehouse> {
        validate_code(&input.code).map_err(|msg| AppError::Validation {
            field: "code".to_string(),
            message: msg.to_string(),
        })?;

        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM warehouses WHERE code = $1")
                .bind(&input.code)
                .fetch_one(&self.db)
                .await?;
        if existing > 0 {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }

        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            INSERT INTO warehouses (code, name, location, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, code, name, location, is_active, created_by
            "#,
        )
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.location)
        .bind(created_by)
        .fetch_one(&self.db)
        .await?;

        Ok(warehouse)
    }

    /// List warehouses
    pub async fn list(&self, active_only: bool) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT id, code, name, location, is_active, created_by
            FROM warehouses
            WHERE ($1 = false OR is_active = true)
            ORDER BY code ASC
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.db)
        .await?;
        Ok(warehouses)
    }

    /// Get a warehouse by id
    pub async fn get(&self, id: Uuid) -> AppResult<Warehouse> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            "SELECT id, code, name, location, is_active, created_by FROM warehouses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;
        Ok(warehouse)
    }

    /// Update a warehouse. The code is immutable once created.
    pub async fn update(&self, id: Uuid, input: UpdateWarehouseInput) -> AppResult<Warehouse> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            UPDATE warehouses
            SET name = COALESCE($1, name),
                location = COALESCE($2, location),
                is_active = COALESCE($3, is_active)
            WHERE id = $4
            RETURNING id, code, name, location, is_active, created_by
            "#,
        )
        .bind(&input.name)
        .bind(&input.location)
        .bind(input.is_active)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;
        Ok(warehouse)
    }

    /// Create a storage location in a warehouse
    pub async fn create_location(
        &self,
        warehouse_id: Uuid,
        input: CreateLocationInput,
    ) -> AppResult<Location> {
        self.get(warehouse_id).await?;

        validate_code(&input.code).map_err(|msg| AppError::Validation {
            field: "code".to_string(),
            message: msg.to_string(),
        })?;

        if let Some(parent_id) = input.parent_location_id {
            let parent_warehouse = sqlx::query_scalar::<_, Uuid>(
                "SELECT warehouse_id FROM locations WHERE id = $1",
            )
            .bind(parent_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Parent location".to_string()))?;

            if parent_warehouse != warehouse_id {
                return Err(AppError::Validation {
                    field: "parent_location_id".to_string(),
                    message: "Parent location belongs to a different warehouse".to_string(),
                });
            }
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM locations WHERE warehouse_id = $1 AND code = $2",
        )
        .bind(warehouse_id)
        .bind(&input.code)
        .fetch_one(&self.db)
        .await?;
        if existing > 0 {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }

        let location_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO locations (warehouse_id, parent_location_id, code, name)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(warehouse_id)
        .bind(input.parent_location_id)
        .bind(&input.code)
        .bind(&input.name)
        .fetch_one(&self.db)
        .await?;

        self.get_location(location_id).await
    }

    /// Get a location with its path computed from the parent chain
    pub async fn get_location(&self, id: Uuid) -> AppResult<Location> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "{LOCATION_TREE_CTE} SELECT id, warehouse_id, parent_location_id, code, name, path
             FROM tree WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Location".to_string()))?;
        Ok(location)
    }

    /// List the location tree of a warehouse, paths included
    pub async fn list_locations(&self, warehouse_id: Uuid) -> AppResult<Vec<Location>> {
        self.get(warehouse_id).await?;

        let locations = sqlx::query_as::<_, Location>(&format!(
            "{LOCATION_TREE_CTE} SELECT id, warehouse_id, parent_location_id, code, name, path
             FROM tree WHERE warehouse_id = $1 ORDER BY path ASC",
        ))
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;
        Ok(locations)
    }
}

/// Recursive CTE materializing each location's path from its parent chain
/// at query time
const LOCATION_TREE_CTE: &str = r#"
    WITH RECURSIVE tree AS (
        SELECT id, warehouse_id, parent_location_id, code, name,
               '/' || code AS path
        FROM locations
        WHERE parent_location_id IS NULL
        UNION ALL
        SELECT l.id, l.warehouse_id, l.parent_location_id, l.code, l.name,
               t.path || '/' || l.code
        FROM locations l
        JOIN tree t ON l.parent_location_id = t.id
    )
"#;
