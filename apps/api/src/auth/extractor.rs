use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};

use crate::auth::tokens::TokenType;
use crate::auth::users;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Could not validate credentials";

/// The authenticated, active account behind the request's bearer token.
///
/// Any failure (missing header, bad token, refresh token, unknown or inactive
/// user) yields the same 401 so callers learn nothing about which check failed.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRow);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(unauthorized)?;

        let claims = state.tokens.verify(token, TokenType::Access).map_err(|e| {
            tracing::warn!(reason = %e, "authentication failed: invalid bearer token");
            unauthorized()
        })?;

        let user = users::find_by_id(&state.db, claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(unauthorized)?;

        Ok(CurrentUser(user))
    }
}

fn unauthorized() -> AppError {
    AppError::Unauthorized(INVALID_CREDENTIALS.to_string())
}

/// Returns the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
