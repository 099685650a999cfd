use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::auth::extractor::CurrentUser;
use crate::auth::password::{
    hash_password_blocking, verify_password_blocking, verify_unknown_login_blocking,
};
use crate::auth::tokens::{TokenPair, TokenType};
use crate::auth::users::{self, availability_response, nothing_to_check, AvailabilityResponse, NewUser};
use crate::auth::validation::{normalize_email, validate_email, validate_password, validate_username};
use crate::errors::{AppError, ErrorBody};
use crate::extract::ApiJson;
use crate::models::user::UserRow;
use crate::state::AppState;

const BAD_LOGIN: &str = "Incorrect login or password";

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub username: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SigninRequest {
    /// E-mail address or username.
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    pub email: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OnboardingRequest {
    pub onboarding: bool,
}

/// POST /auth/signup
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = TokenPair),
        (status = 400, description = "Invalid e-mail, username or weak password", body = ErrorBody),
        (status = 409, description = "E-mail or username already registered", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<TokenPair>), AppError> {
    let email = normalize_email(&req.email);
    validate_email(&email)?;
    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    if let Some(username) = username {
        validate_username(username)?;
    }
    validate_password(&req.password)?;

    let password_hash = hash_password_blocking(req.password).await?;
    let user = users::insert_user(
        &state.db,
        NewUser {
            email: &email,
            username,
            password_hash: &password_hash,
        },
    )
    .await?;

    info!(user_id = %user.id, "User signed up");
    let pair = state.tokens.issue_pair(user.id)?;
    Ok((StatusCode::CREATED, Json(pair)))
}

/// POST /auth/signin
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenPair),
        (status = 401, description = "Incorrect login or password", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn signin(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SigninRequest>,
) -> Result<Json<TokenPair>, AppError> {
    info!(login = %req.login, "Sign-in attempt");

    let Some(user) = users::find_by_login(&state.db, &req.login).await? else {
        verify_unknown_login_blocking(req.password).await?;
        warn!(login = %req.login, "Sign-in rejected");
        return Err(AppError::Unauthorized(BAD_LOGIN.to_string()));
    };

    let password_ok = verify_password_blocking(req.password, user.password_hash.clone()).await?;
    if !password_ok || !user.is_active {
        warn!(login = %req.login, "Sign-in rejected");
        return Err(AppError::Unauthorized(BAD_LOGIN.to_string()));
    }

    Ok(Json(state.tokens.issue_pair(user.id)?))
}

/// POST /auth/refresh
///
/// Issues a fresh access token; the refresh token is returned unchanged.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = TokenPair),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let claims = state.tokens.verify(&req.refresh_token, TokenType::Refresh)?;

    let user = users::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))?;

    Ok(Json(TokenPair {
        access_token: state.tokens.issue(user.id, TokenType::Access)?,
        refresh_token: req.refresh_token,
        token_type: "bearer".to_string(),
    }))
}

/// GET /auth/me
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserRow),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserRow> {
    Json(user)
}

/// POST /auth/check-availability
#[utoipa::path(
    post,
    path = "/auth/check-availability",
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Availability of the given fields", body = AvailabilityResponse),
    ),
    tag = "auth"
)]
pub async fn check_availability(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let email = req
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty());
    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    if email.is_none() && username.is_none() {
        return Ok(Json(nothing_to_check()));
    }

    let taken = users::taken_fields(&state.db, email.as_deref(), username).await?;
    Ok(Json(availability_response(&taken)))
}

/// PATCH /auth/onboarding
#[utoipa::path(
    patch,
    path = "/auth/onboarding",
    request_body = OnboardingRequest,
    responses(
        (status = 200, description = "Updated user", body = UserRow),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn onboarding(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<OnboardingRequest>,
) -> Result<Json<UserRow>, AppError> {
    let user = users::set_onboarding(&state.db, user.id, req.onboarding).await?;
    Ok(Json(user))
}
