use crate::errors::AppError;
use crate::models::cover_letter::CoverLetterContent;

pub const MAX_SECTION_CHARS: usize = 2000;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_JOB_FIELD_CHARS: usize = 100;
pub const MAX_TAG_CHARS: usize = 50;

pub fn validate_content(content: &CoverLetterContent) -> Result<(), AppError> {
    for (field, text) in content.sections() {
        if text.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} must not be empty")));
        }
        if text.chars().count() > MAX_SECTION_CHARS {
            return Err(AppError::Validation(format!(
                "{field} must be at most {MAX_SECTION_CHARS} characters"
            )));
        }
    }
    Ok(())
}

/// Trimmed name, 1..=100 characters.
pub fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "name must be between 1 and {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// Trims an optional job title or company name; blank becomes `None`.
pub fn validate_job_field(field: &str, value: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > MAX_JOB_FIELD_CHARS {
        return Err(AppError::Validation(format!(
            "{field} must be at most {MAX_JOB_FIELD_CHARS} characters"
        )));
    }
    Ok(Some(value.to_string()))
}

/// Trims tags, drops blanks and repeats (first occurrence wins).
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, AppError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_CHARS {
            return Err(AppError::Validation(format!(
                "tags must be at most {MAX_TAG_CHARS} characters each"
            )));
        }
        if !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    Ok(out)
}
