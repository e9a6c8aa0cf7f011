//! Account HTTP Handlers
//!
//! REST API endpoints for registration, login, token refresh and profile
//! operations. Tokens are delivered as `HttpOnly`, `Secure` cookies as well as
//! in the response body.

use crate::error::ApiError;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::middleware;
use crate::models::*;
use crate::service::AccountService;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::sync::Arc;

/// Shared account service state
pub type AppState = Arc<AccountService>;

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

// ============================================
// Route Builder
// ============================================

/// Create account routes
pub fn create_routes(state: AppState, max_upload_bytes: usize) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route(
            "/register",
            post(register).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token));

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
}

fn token_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .path("/")
        .build()
}

/// Removal cookie, sent whether or not the client presented the cookie
fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .secure(secure)
        .path("/")
        .removal()
        .build()
}

fn with_token_cookies(jar: CookieJar, tokens: &TokenPair, secure: bool) -> CookieJar {
    jar.add(token_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        secure,
    ))
    .add(token_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        secure,
    ))
}

// ============================================
// Registration
// ============================================

/// POST /register
///
/// Multipart form: `username`, `fullName`, `email`, `password`, an `avatar`
/// image and an optional `coverImage` image.
pub async fn register(
    State(accounts): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut req = RegisterRequest::default();
    let mut avatar = None;
    let mut cover_image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "avatar" | "coverImage" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?
                    .to_vec();

                if data.is_empty() {
                    continue;
                }

                let upload = Upload {
                    file_name,
                    content_type,
                    data,
                };
                if name == "avatar" {
                    avatar = Some(upload);
                } else {
                    cover_image = Some(upload);
                }
            }
            "username" | "fullName" | "email" | "password" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;

                match name.as_str() {
                    "username" => req.username = value,
                    "fullName" => req.full_name = value,
                    "email" => req.email = value,
                    _ => req.password = value,
                }
            }
            other => {
                return Err(ApiError::BadRequest(format!("Unexpected field '{other}'")));
            }
        }
    }

    let user = accounts.register(req, avatar, cover_image).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(201, user, "User registered successfully")),
    ))
}

// ============================================
// Login / Logout
// ============================================

/// POST /login
///
/// Authenticate by username or email and set both token cookies
pub async fn login(
    State(accounts): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = accounts.login(req).await?;

    let tokens = TokenPair {
        access_token: response.access_token.clone(),
        refresh_token: response.refresh_token.clone(),
    };
    let jar = with_token_cookies(jar, &tokens, accounts.config().cookie_secure);

    Ok((
        jar,
        Json(ApiResponse::ok(response, "User logged in successfully")),
    ))
}

/// POST /logout
///
/// Clear the stored refresh token and both cookies
pub async fn logout(
    State(accounts): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    accounts.logout(user.id).await?;

    let secure = accounts.config().cookie_secure;
    let jar = jar
        .add(expired_cookie(ACCESS_TOKEN_COOKIE, secure))
        .add(expired_cookie(REFRESH_TOKEN_COOKIE, secure));

    Ok((
        jar,
        Json(ApiResponse::ok(serde_json::json!({}), "User logged out")),
    ))
}

// ============================================
// Token Refresh
// ============================================

/// POST /refresh-token
///
/// Rotate the refresh token. The `refreshToken` cookie wins over the body.
///
/// The JSON body is optional, but when present it must parse.
pub async fn refresh_token(
    State(accounts): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshTokenRequest::default()
    } else {
        serde_json::from_slice::<RefreshTokenRequest>(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };

    let incoming = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|token| !token.is_empty())
        .or(req.refresh_token);

    let tokens = accounts.refresh_access_token(incoming.as_deref()).await?;
    let jar = with_token_cookies(jar, &tokens, accounts.config().cookie_secure);

    Ok((jar, Json(ApiResponse::ok(tokens, "Access token refreshed"))))
}

// ============================================
// Password Management
// ============================================

/// POST /change-password
pub async fn change_password(
    State(accounts): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    accounts.change_password(user.id, req).await?;

    Ok(Json(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    )))
}

// ============================================
// User Profile
// ============================================

/// GET /current-user
pub async fn current_user(
    State(accounts): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = accounts.current_user(user.id).await?;

    Ok(Json(ApiResponse::ok(user, "Current user fetched successfully")))
}

/// PATCH /update-account
pub async fn update_account(
    State(accounts): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = accounts.update_account(user.id, req).await?;

    Ok(Json(ApiResponse::ok(
        user,
        "Account details updated successfully",
    )))
}
