//! Authentication Middleware
//!
//! Guards protected routes by resolving the access token once per request.

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::handlers::AppState;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Require authenticated user
///
/// Validates the access token (cookie or bearer header), loads the user and
/// stores it in request extensions for the `AuthUser` extractor.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = AuthUser::from_headers(req.headers(), &state).await?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
