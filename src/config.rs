//! Service Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::ApiError;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Token and credential configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret for signing access tokens (from ACCESS_TOKEN_SECRET env var)
    pub access_token_secret: String,

    /// Access token lifetime in seconds (from ACCESS_TOKEN_EXPIRY env var)
    pub access_token_expiration: i64,

    /// Secret for signing refresh tokens (from REFRESH_TOKEN_SECRET env var)
    pub refresh_token_secret: String,

    /// Refresh token lifetime in seconds (from REFRESH_TOKEN_EXPIRY env var)
    pub refresh_token_expiration: i64,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// JWT audience for access tokens (from JWT_AUDIENCE env var)
    pub jwt_audience: String,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Minimum password length (from MIN_PASSWORD_LENGTH env var)
    pub min_password_length: usize,

    /// Mark token cookies `Secure` (from COOKIE_SECURE env var)
    pub cookie_secure: bool,
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self {
            access_token_secret: required("ACCESS_TOKEN_SECRET")?,

            access_token_expiration: parsed("ACCESS_TOKEN_EXPIRY", 900), // 15 minutes

            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?,

            refresh_token_expiration: parsed("REFRESH_TOKEN_EXPIRY", 864_000), // 10 days

            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "account-service".to_string()),

            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "account-api".to_string()),

            argon2_memory_cost: parsed("ARGON2_MEMORY_COST", 19_456), // 19 MiB

            argon2_time_cost: parsed("ARGON2_TIME_COST", 2),

            argon2_parallelism: parsed("ARGON2_PARALLELISM", 1),

            min_password_length: parsed("MIN_PASSWORD_LENGTH", 8),

            cookie_secure: env::var("COOKIE_SECURE")
                .ok()
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.access_token_secret.len() < 32 {
            return Err(ApiError::Config(
                "ACCESS_TOKEN_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.refresh_token_secret.len() < 32 {
            return Err(ApiError::Config(
                "REFRESH_TOKEN_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.access_token_secret == self.refresh_token_secret {
            return Err(ApiError::Config(
                "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".to_string(),
            ));
        }

        if self.access_token_expiration <= 0 {
            return Err(ApiError::Config(
                "ACCESS_TOKEN_EXPIRY must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiration <= self.access_token_expiration {
            return Err(ApiError::Config(
                "REFRESH_TOKEN_EXPIRY must be greater than ACCESS_TOKEN_EXPIRY".to_string(),
            ));
        }

        if self.min_password_length < 8 {
            return Err(ApiError::Config(
                "MIN_PASSWORD_LENGTH must be at least 8".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP server and collaborator configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (from BIND_ADDRESS env var)
    pub bind_address: SocketAddr,

    /// PostgreSQL connection string (from DATABASE_URL env var).
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Directory uploaded files are written to (from UPLOAD_DIR env var)
    pub upload_dir: PathBuf,

    /// Public URL prefix uploaded files are served under (from MEDIA_BASE_URL env var)
    pub media_base_url: String,

    /// Allowed browser origin for credentialed requests (from CORS_ORIGIN env var)
    pub cors_origin: Option<String>,

    /// Request body limit for uploads (from MAX_UPLOAD_BYTES env var)
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ApiError> {
        let bind_address = env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
            .parse()
            .map_err(|_| ApiError::Config("BIND_ADDRESS must be a socket address".to_string()))?;

        Ok(Self {
            bind_address,
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "./public/uploads".to_string())
                .into(),
            media_base_url: env::var("MEDIA_BASE_URL").unwrap_or_else(|_| "/media".to_string()),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
        })
    }
}

fn required(key: &str) -> Result<String, ApiError> {
    env::var(key).map_err(|_| ApiError::Config(format!("{key} environment variable must be set")))
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "a".repeat(32),
            access_token_expiration: 900,
            refresh_token_secret: "r".repeat(32),
            refresh_token_expiration: 864_000,
            jwt_issuer: "test".to_string(),
            jwt_audience: "test".to_string(),
            argon2_memory_cost: 4096,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            min_password_length: 8,
            cookie_secure: true,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_short_secret() {
        let config = AuthConfig {
            refresh_token_secret: "short".to_string(),
            ..config()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_shared_secret() {
        let config = AuthConfig {
            refresh_token_secret: "a".repeat(32),
            ..config()
        };

        assert!(matches!(config.validate(), Err(ApiError::Config(_))));
    }

    #[test]
    fn test_config_validation_refresh_outlives_access() {
        let config = AuthConfig {
            refresh_token_expiration: 600,
            ..config()
        };

        assert!(config.validate().is_err());
    }
}
