//! Input rules for account fields.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::AppError;

const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";
const MIN_PASSWORD_LEN: usize = 8;

pub const PASSWORD_RULES_MESSAGE: &str = "Password must be at least 8 characters long and contain at least one uppercase letter, \
     one lowercase letter, one number, and one special character";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
    })
}

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,50}$").expect("username regex is valid"))
}

/// Trims and lower-cases an e-mail address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid email address".to_string()))
    }
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username_regex().is_match(username) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Username must be 3-50 characters of letters, digits, '_', '.' or '-'".to_string(),
        ))
    }
}

pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if is_strong_password(password) {
        Ok(())
    } else {
        Err(AppError::Validation(PASSWORD_RULES_MESSAGE.to_string()))
    }
}
