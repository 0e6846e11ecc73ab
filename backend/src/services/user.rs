//! User and role administration service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::types::Pagination;

/// User service for administration endpoints
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// User record as exposed to administrators
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role_id: Option<Uuid>,
    pub role_name: Option<String>,
    pub role_level: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Role record
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub level: i32,
}

/// Input for administrative user updates
#[derive(Debug, Deserialize)]
pub struct UpdateUserInput {
    pub full_name: Option<String>,
    pub role_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

const USER_COLUMNS: &str = "u.id, u.email, u.full_name, u.role_id, \
     r.name AS role_name, r.level AS role_level, u.is_active, u.created_at, u.updated_at";

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List users
    pub async fn list(&self, paging: Pagination) -> AppResult<Vec<User>> {
        let paging = paging.clamped();
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            ORDER BY u.created_at ASC
            OFFSET $1 LIMIT $2
            "#,
        ))
        .bind(paging.skip)
        .bind(paging.limit)
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    /// Get a user by id
    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE u.id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
        Ok(user)
    }

    /// Update a user's name, role, or active flag
    pub async fn update(&self, id: Uuid, input: UpdateUserInput) -> AppResult<User> {
        if let Some(role_id) = input.role_id {
            let exists =
                sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
                    .bind(role_id)
                    .fetch_one(&self.db)
                    .await?;
            if !exists {
                return Err(AppError::NotFound("Role".to_string()));
            }
        }

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET full_name = COALESCE($1, full_name),
                role_id = COALESCE($2, role_id),
                is_active = COALESCE($3, is_active),
                updated_at = now()
            WHERE id = $4
            "#,
        )
        .bind(&input.full_name)
        .bind(input.role_id)
        .bind(input.is_active)
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }

        self.get(id).await
    }

    /// List the role ladder
    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, name, description, level FROM roles ORDER BY level ASC",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(roles)
    }
}
