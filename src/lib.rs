//! Account Service
//!
//! User account backend providing:
//! - Registration with avatar/cover image upload
//! - Login by username or email
//! - JWT access tokens and refresh tokens signed with separate secrets
//! - Refresh token rotation with reuse detection (one live refresh token per user)
//! - Logout, password change and profile updates
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `ACCESS_TOKEN_SECRET` - Secret for signing access tokens (required, min 32 chars)
//! - `ACCESS_TOKEN_EXPIRY` - Access token expiration in seconds (default: 900)
//! - `REFRESH_TOKEN_SECRET` - Secret for signing refresh tokens (required, min 32 chars)
//! - `REFRESH_TOKEN_EXPIRY` - Refresh token expiration in seconds (default: 864000)
//! - `DATABASE_URL` - PostgreSQL connection string (in-memory store when unset)
//!
//! # Usage
//!
//! ```rust,ignore
//! use account_service::{AccountService, AuthConfig, MemoryUserStore, LocalBlobStore};
//!
//! let config = AuthConfig::from_env()?;
//! config.validate()?;
//!
//! let accounts = Arc::new(AccountService::new(
//!     config,
//!     Arc::new(MemoryUserStore::new()),
//!     Arc::new(LocalBlobStore::new("./uploads", "/media")),
//! )?);
//! let app = account_service::create_routes(accounts, 10 * 1024 * 1024);
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod storage;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use config::{AuthConfig, ServerConfig};
pub use error::ApiError;
pub use extractors::AuthUser;
pub use handlers::{create_routes, AppState};
pub use models::*;
pub use password::PasswordHasher;
pub use service::AccountService;
pub use storage::{BlobStore, LocalBlobStore};
pub use store::{MemoryUserStore, PgUserStore, UserStore};
pub use token::TokenIssuer;
