use super::UserStore;
use crate::error::ApiError;
use crate::models::{NewUser, User};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the users table if it does not exist
    pub async fn migrate(&self) -> Result<(), ApiError> {
        tracing::info!("Running account database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username VARCHAR(50) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(100) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                avatar VARCHAR(500),
                cover_image VARCHAR(500),
                refresh_token TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        tracing::info!("Account migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as(
            "SELECT * FROM users WHERE username = $1 OR email = $2 ORDER BY created_at LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, full_name, password_hash, avatar, cover_image)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.cover_image)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn replace_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET refresh_token = $3, updated_at = NOW()
            WHERE id = $1 AND refresh_token = $2
            "#,
        )
        .bind(id)
        .bind(current)
        .bind(next)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as(
            r#"
            UPDATE users SET full_name = $2, email = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }
}
