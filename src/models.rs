//! Account Models
//!
//! Data structures for account requests, responses, and database entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ============================================
// Database Entities
// ============================================

/// User entity from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a user record
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

// ============================================
// Request DTOs
// ============================================

/// Login request; either `username` or `email` identifies the account
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub username: Option<String>,

    pub email: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration fields (files arrive separately in the multipart body)
#[derive(Debug, Clone, Default, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: String,

    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl RegisterRequest {
    /// True if any field is missing or blank
    pub fn has_blank_field(&self) -> bool {
        [&self.username, &self.full_name, &self.email, &self.password]
            .iter()
            .any(|field| field.trim().is_empty())
    }
}

/// Refresh token request; the cookie takes precedence over this body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

/// Change password request (for authenticated users)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Account details update
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: String,

    #[serde(default)]
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
}

/// File received from a multipart upload
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

// ============================================
// Response DTOs
// ============================================

/// User response (public user data without password hash or refresh token)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Freshly issued access/refresh pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Success envelope shared by every endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status_code: u16, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code,
            data,
            message: message.into(),
            success: status_code < 400,
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(200, data, message)
    }
}

// ============================================
// JWT Claims
// ============================================

/// JWT claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    /// JWT ID (unique identifier)
    pub jti: Uuid,
}

/// JWT claims for refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    /// Keeps two tokens minted in the same second distinct
    pub jti: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            full_name: "Alice Liddell".into(),
            password_hash: "$argon2id$secret".into(),
            avatar: Some("/media/a.png".into()),
            cover_image: None,
            refresh_token: Some("refresh".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_response_omits_secrets() {
        let json = serde_json::to_value(UserResponse::from(user())).unwrap();

        assert_eq!(json["fullName"], "Alice Liddell");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refreshToken").is_none());
    }

    #[test]
    fn test_login_request_rejects_unknown_fields() {
        let parsed: Result<LoginRequest, _> =
            serde_json::from_str(r#"{"username":"alice","password":"x","role":"admin"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_register_blank_fields() {
        let req = RegisterRequest {
            username: "alice".into(),
            full_name: "  ".into(),
            email: "alice@example.com".into(),
            password: "Secret1!".into(),
        };
        assert!(req.has_blank_field());
    }

    #[test]
    fn test_register_email_fits_column() {
        let label = "x".repeat(60);
        let email = format!("{}@{label}.{label}.{label}.{label}.com", "a".repeat(64));
        assert!(email.len() > 255);

        let req = RegisterRequest {
            username: "alice".into(),
            full_name: "Alice".into(),
            email,
            password: "Secret1!".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_envelope_success_flag() {
        assert!(ApiResponse::ok((), "fine").success);
        assert!(!ApiResponse::new(404, (), "missing").success);
    }
}
