use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserRow;

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: Option<&'a str>,
    pub password_hash: &'a str,
}

/// Inserts a user, reporting which unique field collided.
pub async fn insert_user(db: &PgPool, new: NewUser<'_>) -> Result<UserRow, AppError> {
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, email, username, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.email)
    .bind(new.username)
    .bind(new.password_hash)
    .fetch_one(db)
    .await
    .map_err(map_duplicate)
}

fn map_duplicate(e: sqlx::Error) -> AppError {
    let constraint = e
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .and_then(|db| db.constraint().map(str::to_owned));
    match constraint.as_deref() {
        Some("users_email_key") => AppError::Conflict("Email already registered".to_string()),
        Some("users_username_key") => AppError::Conflict("Username already taken".to_string()),
        _ => AppError::from(e),
    }
}

/// Looks a user up by e-mail (case-insensitive) or exact username.
pub async fn find_by_login(db: &PgPool, login: &str) -> Result<Option<UserRow>, AppError> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE email = lower($1) OR username = $1 LIMIT 1",
    )
    .bind(login.trim())
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<UserRow>, AppError> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

/// Returns the subset of `["email", "username"]` already in use.
pub async fn taken_fields(
    db: &PgPool,
    email: Option<&str>,
    username: Option<&str>,
) -> Result<Vec<&'static str>, AppError> {
    let mut taken = Vec::new();
    if let Some(email) = email {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(db)
            .await?;
        if exists {
            taken.push("email");
        }
    }
    if let Some(username) = username {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(db)
                .await?;
        if exists {
            taken.push("username");
        }
    }
    Ok(taken)
}

pub async fn set_onboarding(db: &PgPool, id: Uuid, onboarding: bool) -> Result<UserRow, AppError> {
    sqlx::query_as::<_, UserRow>(
        "UPDATE users SET onboarding = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(onboarding)
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub is_available: bool,
    pub message: String,
}

pub fn availability_response(taken: &[&str]) -> AvailabilityResponse {
    if taken.is_empty() {
        AvailabilityResponse {
            is_available: true,
            message: "All checked fields are available".to_string(),
        }
    } else {
        AvailabilityResponse {
            is_available: false,
            message: format!("Following fields are already taken: {}", taken.join(", ")),
        }
    }
}

pub fn nothing_to_check() -> AvailabilityResponse {
    AvailabilityResponse {
        is_available: false,
        message: "At least one field (email or username) must be provided".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_available() {
        let resp = availability_response(&[]);
        assert!(resp.is_available);
        assert_eq!(resp.message, "All checked fields are available");
    }

    #[test]
    fn test_taken_fields_listed_in_order() {
        let resp = availability_response(&["email", "username"]);
        assert!(!resp.is_available);
        assert_eq!(resp.message, "Following fields are already taken: email, username");
    }

    #[test]
    fn test_single_taken_field() {
        let resp = availability_response(&["username"]);
        assert_eq!(resp.message, "Following fields are already taken: username");
    }

    #[test]
    fn test_nothing_to_check() {
        let resp = nothing_to_check();
        assert!(!resp.is_available);
        assert!(resp.message.starts_with("At least one field"));
    }

    #[test]
    fn test_non_database_error_passes_through() {
        assert!(matches!(map_duplicate(sqlx::Error::RowNotFound), AppError::Database(_)));
    }
}
