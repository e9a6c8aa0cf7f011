//! Request Extractors
//!
//! Axum extractors for the authenticated user and validated JSON bodies.

use crate::error::ApiError;
use crate::handlers::{AppState, ACCESS_TOKEN_COOKIE};
use crate::models::UserResponse;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    Json,
};
use axum_extra::extract::CookieJar;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Authenticated user resolved from the access token
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserResponse);

impl AuthUser {
    /// Access tokens offered by the request, `accessToken` cookie first and
    /// then the `Authorization: Bearer` header. Empty values are skipped.
    pub fn tokens_from_headers(headers: &HeaderMap) -> Vec<String> {
        let cookie = CookieJar::from_headers(headers)
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().trim().to_owned());

        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|token| token.trim().to_owned());

        cookie
            .into_iter()
            .chain(bearer)
            .filter(|token| !token.is_empty())
            .collect()
    }

    /// Resolve the user from the first offered token that verifies.
    ///
    /// A stale cookie does not shadow a valid bearer token.
    pub async fn from_headers(headers: &HeaderMap, state: &AppState) -> Result<Self, ApiError> {
        let mut rejection = ApiError::Unauthorized("Unauthorized request".into());

        for token in Self::tokens_from_headers(headers) {
            match state.authenticate(&token).await {
                Ok(user) => return Ok(AuthUser(user)),
                Err(e) => rejection = e,
            }
        }

        Err(rejection)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // First, check if the user was already resolved by middleware
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        Self::from_headers(&parts.headers, state).await
    }
}

/// JSON body that has been deserialized and validated
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        value
            .validate()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};

    #[test]
    fn test_cookie_is_offered_before_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(COOKIE, HeaderValue::from_static("accessToken=from-cookie"));

        assert_eq!(
            AuthUser::tokens_from_headers(&headers),
            vec!["from-cookie".to_string(), "from-header".to_string()]
        );
    }

    #[test]
    fn test_empty_cookie_is_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(COOKIE, HeaderValue::from_static("accessToken="));

        assert_eq!(
            AuthUser::tokens_from_headers(&headers),
            vec!["from-header".to_string()]
        );
    }

    #[test]
    fn test_no_tokens() {
        assert!(AuthUser::tokens_from_headers(&HeaderMap::new()).is_empty());
    }
}
