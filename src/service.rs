//! Account Service
//!
//! Credential and session-token lifecycle: registration, login, refresh token
//! rotation, logout and password management.

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::models::*;
use crate::password::PasswordHasher;
use crate::storage::BlobStore;
use crate::store::UserStore;
use crate::token::TokenIssuer;

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Account service
pub struct AccountService {
    store: Arc<dyn UserStore>,
    blobs: Arc<dyn BlobStore>,
    tokens: TokenIssuer,
    hasher: PasswordHasher,
    config: AuthConfig,
}

impl AccountService {
    /// Create a new account service
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn UserStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            tokens: TokenIssuer::new(&config),
            hasher: PasswordHasher::new(&config)?,
            store,
            blobs,
            config,
        })
    }

    /// Get reference to config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    // ============================================
    // Password Hashing
    // ============================================

    async fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                tracing::error!("Password hashing task failed: {:?}", e);
                ApiError::Internal("Something went wrong while processing the password".into())
            })?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| {
                tracing::error!("Password verification task failed: {:?}", e);
                ApiError::Internal("Something went wrong while processing the password".into())
            })
    }

    // ============================================
    // Registration
    // ============================================

    /// Register a new user
    pub async fn register(
        &self,
        req: RegisterRequest,
        avatar: Option<Upload>,
        cover_image: Option<Upload>,
    ) -> Result<UserResponse, ApiError> {
        if req.has_blank_field() {
            return Err(ApiError::BadRequest("All fields are required".into()));
        }
        req.validate()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        self.hasher.validate_strength(&req.password)?;

        let username = req.username.trim().to_lowercase();
        let email = req.email.trim().to_lowercase();

        // Check before uploading so a duplicate does not leave orphaned files
        let existing = self
            .store
            .find_by_username_or_email(Some(&username), Some(&email))
            .await?;
        if existing.is_some() {
            return Err(ApiError::Conflict(
                "User with email or username already exists".into(),
            ));
        }

        let avatar = avatar.ok_or_else(|| ApiError::BadRequest("Avatar file is required".into()))?;
        let avatar_url = self.blobs.upload(avatar).await?;
        let mut stored = vec![avatar_url.clone()];

        let created = async {
            let cover_image_url = match cover_image {
                Some(file) => {
                    let url = self.blobs.upload(file).await?;
                    stored.push(url.clone());
                    Some(url)
                }
                None => None,
            };
            let password_hash = self.hash_password(&req.password).await?;

            self.store
                .create(NewUser {
                    username,
                    email,
                    full_name: req.full_name.trim().to_string(),
                    password_hash,
                    avatar: Some(avatar_url),
                    cover_image: cover_image_url,
                })
                .await
        }
        .await;

        let user = match created {
            Ok(user) => user,
            Err(e) => {
                self.discard_uploads(&stored).await;
                return Err(e);
            }
        };

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(UserResponse::from(user))
    }

    /// Best-effort removal of uploads that no account ended up referencing
    async fn discard_uploads(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.blobs.remove(url).await {
                tracing::warn!(url = %url, "Failed to remove orphaned upload: {}", e);
            }
        }
    }

    // ============================================
    // Login / Logout
    // ============================================

    /// Issue a fresh token pair and make its refresh token the stored one
    async fn issue_tokens(&self, user: &User) -> Result<TokenPair, ApiError> {
        let access_token = self.tokens.issue_access_token(user)?;
        let refresh_token = self.tokens.issue_refresh_token(user.id)?;

        self.store
            .set_refresh_token(user.id, Some(&refresh_token))
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Attempt to login a user by username or email
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ApiError> {
        let username = normalized(req.username.as_deref());
        let email = normalized(req.email.as_deref());

        if username.is_none() && email.is_none() {
            return Err(ApiError::BadRequest("Username or email is required".into()));
        }
        if req.password.is_empty() {
            return Err(ApiError::BadRequest("Password is required".into()));
        }

        let user = self
            .store
            .find_by_username_or_email(username.as_deref(), email.as_deref())
            .await?
            .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;

        if !self.verify_password(&req.password, &user.password_hash).await? {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(ApiError::Unauthorized("Invalid user credentials".into()));
        }

        let TokenPair {
            access_token,
            refresh_token,
        } = self.issue_tokens(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
        })
    }

    /// Logout by clearing the stored refresh token
    pub async fn logout(&self, user_id: Uuid) -> Result<(), ApiError> {
        self.store.set_refresh_token(user_id, None).await?;

        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    // ============================================
    // Token Refresh
    // ============================================

    /// Exchange a refresh token for a new access/refresh pair (with rotation)
    pub async fn refresh_access_token(
        &self,
        incoming: Option<&str>,
    ) -> Result<TokenPair, ApiError> {
        let incoming = incoming
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".into()))?;

        let user_id = self.tokens.verify_refresh_token(incoming)?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".into()))?;

        if user.refresh_token.as_deref() != Some(incoming) {
            tracing::warn!(user_id = %user.id, "Refresh token reuse detected");
            return Err(reused_token());
        }

        let access_token = self.tokens.issue_access_token(&user)?;
        let refresh_token = self.tokens.issue_refresh_token(user.id)?;

        // Only rotate if no concurrent refresh has replaced the token since it was read
        let rotated = self
            .store
            .replace_refresh_token(user.id, incoming, &refresh_token)
            .await?;
        if !rotated {
            tracing::warn!(user_id = %user.id, "Refresh token rotated concurrently");
            return Err(reused_token());
        }

        tracing::info!(user_id = %user.id, "Refresh token rotated");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    // ============================================
    // Password Management
    // ============================================

    /// Change password for authenticated user.
    ///
    /// Outstanding access and refresh tokens stay valid.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        req: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        if req.old_password.is_empty() || req.new_password.is_empty() {
            return Err(ApiError::BadRequest(
                "Old and new password are required".into(),
            ));
        }

        let user = self.get_user(user_id).await?;

        if !self.verify_password(&req.old_password, &user.password_hash).await? {
            return Err(ApiError::BadRequest("Invalid old password".into()));
        }

        // Strength is checked on the plaintext only; the stored hash is not revalidated
        self.hasher.validate_strength(&req.new_password)?;
        let password_hash = self.hash_password(&req.new_password).await?;

        self.store.set_password(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    // ============================================
    // Profile
    // ============================================

    /// Resolve an access token to the user it was issued to
    pub async fn authenticate(&self, access_token: &str) -> Result<UserResponse, ApiError> {
        let claims = self.tokens.verify_access_token(access_token)?;

        self.store
            .find_by_id(claims.sub)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| ApiError::Unauthorized("Invalid access token".into()))
    }

    /// Sanitized view of the current user
    pub async fn current_user(&self, user_id: Uuid) -> Result<UserResponse, ApiError> {
        self.get_user(user_id).await.map(UserResponse::from)
    }

    /// Update full name and email
    pub async fn update_account(
        &self,
        user_id: Uuid,
        req: UpdateAccountRequest,
    ) -> Result<UserResponse, ApiError> {
        if req.full_name.trim().is_empty() || req.email.trim().is_empty() {
            return Err(ApiError::BadRequest("All fields are required".into()));
        }
        req.validate()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let email = req.email.trim().to_lowercase();
        let user = self
            .store
            .update_account(user_id, req.full_name.trim(), &email)
            .await?
            .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;

        tracing::info!(user_id = %user.id, "Account details updated");
        Ok(UserResponse::from(user))
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User does not exist".into()))
    }
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn reused_token() -> ApiError {
    ApiError::Unauthorized("Refresh token is invalid or used".into())
}
