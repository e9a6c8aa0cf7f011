//! Access and refresh token issuing.
//!
//! Access and refresh tokens are HS256 JWTs signed with two different secrets,
//! so one kind can never be replayed as the other.

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::models::{AccessTokenClaims, RefreshTokenClaims, User};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

/// Mints and verifies signed tokens
pub struct TokenIssuer {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    access_token_expiration: i64,
    refresh_token_expiration: i64,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let access_secret = config.access_token_secret.as_bytes();
        let refresh_secret = config.refresh_token_secret.as_bytes();

        Self {
            access_encoding_key: EncodingKey::from_secret(access_secret),
            access_decoding_key: DecodingKey::from_secret(access_secret),
            refresh_encoding_key: EncodingKey::from_secret(refresh_secret),
            refresh_decoding_key: DecodingKey::from_secret(refresh_secret),
            access_token_expiration: config.access_token_expiration,
            refresh_token_expiration: config.refresh_token_expiration,
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
        }
    }

    /// Generate an access token for a user
    pub fn issue_access_token(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expiration);

        let claims = AccessTokenClaims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::default(), &claims, &self.access_encoding_key).map_err(signing_failed)
    }

    /// Generate a refresh token for a user
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.refresh_token_expiration);

        let claims = RefreshTokenClaims {
            sub: user_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::default(), &claims, &self.refresh_encoding_key).map_err(signing_failed)
    }

    /// Validate an access token
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, ApiError> {
        let mut validation = self.validation();
        validation.set_audience(&[&self.audience]);

        decode::<AccessTokenClaims>(token, &self.access_decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Access token rejected: {:?}", e);
                ApiError::Unauthorized("Invalid access token".to_string())
            })
    }

    /// Validate a refresh token and return the user it was issued to.
    ///
    /// Expiry and signature failures are reported identically.
    pub fn verify_refresh_token(&self, token: &str) -> Result<Uuid, ApiError> {
        decode::<RefreshTokenClaims>(token, &self.refresh_decoding_key, &self.validation())
            .map(|data| data.claims.sub)
            .map_err(|e| {
                tracing::debug!("Refresh token rejected: {:?}", e);
                ApiError::Unauthorized("Invalid refresh token".to_string())
            })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;
        validation
    }
}

fn signing_failed(err: jsonwebtoken::errors::Error) -> ApiError {
    tracing::error!("JWT signing error: {:?}", err);
    ApiError::Internal("Something went wrong while generating tokens".to_string())
}
