//! User persistence.
//!
//! The service only talks to [`UserStore`]; `PgUserStore` backs production and
//! `MemoryUserStore` backs local runs without a database and the test suite.

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use crate::error::ApiError;
use crate::models::{NewUser, User};

use async_trait::async_trait;
use uuid::Uuid;

/// User records keyed by id, including the single current refresh token
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user whose username or email matches either given value
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, ApiError>;

    /// Get user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError>;

    /// Insert a user; a taken username or email is a `Conflict`
    async fn create(&self, user: NewUser) -> Result<User, ApiError>;

    /// Overwrite (or clear, with `None`) the stored refresh token
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), ApiError>;

    /// Store `next` only if the stored refresh token still equals `current`.
    ///
    /// Returns `false` when another writer got there first.
    async fn replace_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, ApiError>;

    /// Replace the password hash
    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), ApiError>;

    /// Update profile fields, returning the updated record
    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, ApiError>;
}
