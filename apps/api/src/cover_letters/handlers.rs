use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::cover_letters::placeholders::extract_placeholders;
use crate::cover_letters::prompts::{generate_prompt, render_prompt};
use crate::cover_letters::validation::{
    normalize_tags, validate_content, validate_job_field, validate_name,
};
use crate::errors::{AppError, ErrorBody};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::llm_client::prompts::{candidate_json, PLAIN_TEXT_SYSTEM};
use crate::models::cover_letter::{
    ContentSection, CoverLetterContent, CoverLetterRow, CoverLetterStatus,
};
use crate::models::DeletedResponse;
use crate::pagination::{PageParams, Paginated};
use crate::resumes::handlers::{find_owned as find_owned_resume, require_parsed};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CoverLetterListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<CoverLetterStatus>,
    /// Case-insensitive match on name, job title, company and every section.
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CoverLetterCreate {
    pub name: String,
    pub content: CoverLetterContent,
    pub status: Option<CoverLetterStatus>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; a blank `job_title` or `company_name` clears it.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CoverLetterUpdate {
    pub name: Option<String>,
    pub content: Option<CoverLetterContent>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl CoverLetterUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.content.is_none()
            && self.job_title.is_none()
            && self.company_name.is_none()
            && self.tags.is_none()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CoverLetterStatusUpdate {
    pub status: CoverLetterStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    pub resume_id: Uuid,
    pub prompt: String,
    /// `introduction`, `body_part_1`, `body_part_2` or `conclusion`.
    pub content_type: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GeneratedText {
    pub text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenderRequest {
    pub job_description: String,
    pub content: CoverLetterContent,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RenderedLetter {
    pub text: String,
    /// Placeholders the model left unfilled.
    pub unresolved_placeholders: Vec<String>,
}

/// Validated column values shared by create and update.
struct CoverLetterFields {
    name: String,
    content: CoverLetterContent,
    job_title: Option<String>,
    company_name: Option<String>,
    tags: Vec<String>,
}

impl CoverLetterFields {
    fn from_create(req: CoverLetterCreate) -> Result<Self, AppError> {
        validate_content(&req.content)?;
        Ok(Self {
            name: validate_name(&req.name)?,
            job_title: validate_job_field("job_title", req.job_title.as_deref())?,
            company_name: validate_job_field("company_name", req.company_name.as_deref())?,
            tags: normalize_tags(&req.tags)?,
            content: req.content,
        })
    }

    fn merge(existing: CoverLetterRow, req: CoverLetterUpdate) -> Result<Self, AppError> {
        let content = req.content.unwrap_or(existing.content.0);
        validate_content(&content)?;
        Ok(Self {
            name: match req.name {
                Some(name) => validate_name(&name)?,
                None => existing.name,
            },
            job_title: match req.job_title {
                Some(v) => validate_job_field("job_title", Some(&v))?,
                None => existing.job_title,
            },
            company_name: match req.company_name {
                Some(v) => validate_job_field("company_name", Some(&v))?,
                None => existing.company_name,
            },
            tags: match req.tags {
                Some(tags) => normalize_tags(&tags)?,
                None => existing.tags,
            },
            content,
        })
    }
}

async fn find_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<CoverLetterRow, AppError> {
    sqlx::query_as::<_, CoverLetterRow>(
        "SELECT * FROM cover_letters WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound("Cover letter not found".to_string()))
}

/// `%term%` pattern with LIKE wildcards in the term escaped.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

const LIST_FILTER: &str = r#"
    user_id = $1
    AND ($2::text IS NULL OR status = $2)
    AND ($3::text IS NULL
         OR name ILIKE $3
         OR job_title ILIKE $3
         OR company_name ILIKE $3
         OR content->>'introduction' ILIKE $3
         OR content->>'body_part_1' ILIKE $3
         OR content->>'body_part_2' ILIKE $3
         OR content->>'conclusion' ILIKE $3)
"#;

/// GET /cover-letters/list
#[utoipa::path(
    get,
    path = "/cover-letters/list",
    params(CoverLetterListQuery),
    responses(
        (status = 200, description = "Page of cover letters, active first then newest", body = crate::pagination::CoverLetterPage),
        (status = 400, description = "Invalid paging parameters", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cover-letters"
)]
pub async fn list_cover_letters(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<CoverLetterListQuery>,
) -> Result<Json<Paginated<CoverLetterRow>>, AppError> {
    let page = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .validate()?;
    let status = query.status.map(|s| s.as_str());
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);

    let count_sql = format!("SELECT COUNT(*) FROM cover_letters WHERE {LIST_FILTER}");
    let list_sql = format!(
        "SELECT * FROM cover_letters WHERE {LIST_FILTER} ORDER BY status ASC, created_at DESC LIMIT $4 OFFSET $5"
    );

    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(user.id)
        .bind(status)
        .bind(&search)
        .fetch_one(&state.db)
        .await?;

    let list = sqlx::query_as::<_, CoverLetterRow>(&list_sql)
        .bind(user.id)
        .bind(status)
        .bind(&search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&state.db)
        .await?;

    Ok(Json(Paginated::new(list, total, page)))
}

/// POST /cover-letters
#[utoipa::path(
    post,
    path = "/cover-letters",
    request_body = CoverLetterCreate,
    responses(
        (status = 201, description = "Cover letter created", body = CoverLetterRow),
        (status = 400, description = "Validation error", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cover-letters"
)]
pub async fn create_cover_letter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<CoverLetterCreate>,
) -> Result<(StatusCode, Json<CoverLetterRow>), AppError> {
    let status = req.status.unwrap_or(CoverLetterStatus::Archived);
    let fields = CoverLetterFields::from_create(req)?;

    let letter = sqlx::query_as::<_, CoverLetterRow>(
        r#"
        INSERT INTO cover_letters (id, user_id, name, content, status, job_title, company_name, tags)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&fields.name)
    .bind(SqlJson(&fields.content))
    .bind(status.as_str())
    .bind(&fields.job_title)
    .bind(&fields.company_name)
    .bind(&fields.tags)
    .fetch_one(&state.db)
    .await?;

    info!(cover_letter_id = %letter.id, "Cover letter created");
    Ok((StatusCode::CREATED, Json(letter)))
}

/// GET /cover-letters/:id
#[utoipa::path(
    get,
    path = "/cover-letters/{id}",
    params(("id" = Uuid, Path, description = "Cover letter ID")),
    responses(
        (status = 200, description = "Cover letter", body = CoverLetterRow),
        (status = 404, description = "Cover letter not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cover-letters"
)]
pub async fn get_cover_letter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<CoverLetterRow>, AppError> {
    Ok(Json(find_owned(&state.db, id, user.id).await?))
}

/// PATCH /cover-letters/:id
#[utoipa::path(
    patch,
    path = "/cover-letters/{id}",
    params(("id" = Uuid, Path, description = "Cover letter ID")),
    request_body = CoverLetterUpdate,
    responses(
        (status = 200, description = "Updated cover letter", body = CoverLetterRow),
        (status = 400, description = "Empty or invalid update", body = ErrorBody),
        (status = 404, description = "Cover letter not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cover-letters"
)]
pub async fn update_cover_letter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CoverLetterUpdate>,
) -> Result<Json<CoverLetterRow>, AppError> {
    if req.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    let existing = find_owned(&state.db, id, user.id).await?;
    let fields = CoverLetterFields::merge(existing, req)?;

    let letter = sqlx::query_as::<_, CoverLetterRow>(
        r#"
        UPDATE cover_letters
        SET name = $1, content = $2, job_title = $3, company_name = $4, tags = $5, updated_at = now()
        WHERE id = $6 AND user_id = $7
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(SqlJson(&fields.content))
    .bind(&fields.job_title)
    .bind(&fields.company_name)
    .bind(&fields.tags)
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Cover letter not found".to_string()))?;

    Ok(Json(letter))
}

/// PATCH /cover-letters/:id/status
#[utoipa::path(
    patch,
    path = "/cover-letters/{id}/status",
    params(("id" = Uuid, Path, description = "Cover letter ID")),
    request_body = CoverLetterStatusUpdate,
    responses(
        (status = 200, description = "Updated cover letter", body = CoverLetterRow),
        (status = 404, description = "Cover letter not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cover-letters"
)]
pub async fn update_cover_letter_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CoverLetterStatusUpdate>,
) -> Result<Json<CoverLetterRow>, AppError> {
    let letter = sqlx::query_as::<_, CoverLetterRow>(
        "UPDATE cover_letters SET status = $1, updated_at = now() WHERE id = $2 AND user_id = $3 RETURNING *",
    )
    .bind(req.status.as_str())
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Cover letter not found".to_string()))?;
    Ok(Json(letter))
}

/// DELETE /cover-letters/:id
#[utoipa::path(
    delete,
    path = "/cover-letters/{id}",
    params(("id" = Uuid, Path, description = "Cover letter ID")),
    responses(
        (status = 200, description = "Cover letter deleted", body = DeletedResponse),
        (status = 404, description = "Cover letter not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cover-letters"
)]
pub async fn delete_cover_letter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let result = sqlx::query("DELETE FROM cover_letters WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Cover letter not found".to_string()));
    }
    info!(cover_letter_id = %id, "Cover letter deleted");
    Ok(Json(DeletedResponse::new("Cover letter", id)))
}

/// POST /cover-letters/generate
#[utoipa::path(
    post,
    path = "/cover-letters/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated section with {{placeholders}}", body = GeneratedText),
        (status = 400, description = "Unknown content type or empty prompt", body = ErrorBody),
        (status = 404, description = "Resume not found", body = ErrorBody),
        (status = 422, description = "Resume has no parsed data", body = ErrorBody),
        (status = 502, description = "LLM failure", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cover-letters"
)]
pub async fn generate_section(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> Result<Json<GeneratedText>, AppError> {
    let section = ContentSection::parse(req.content_type.trim()).ok_or_else(|| {
        AppError::Validation(
            "content_type must be one of: introduction, body_part_1, body_part_2, conclusion"
                .to_string(),
        )
    })?;

    let resume = find_owned_resume(&state.db, req.resume_id, user.id).await?;
    let parsed = require_parsed(&resume)?;

    let prompt = generate_prompt(&candidate_json(parsed), section, req.prompt.trim());
    let text = state.llm.call_text(&prompt, PLAIN_TEXT_SYSTEM).await?;

    info!(resume_id = %resume.id, section = section.as_str(), "Cover letter section generated");
    Ok(Json(GeneratedText { text }))
}

/// POST /cover-letters/render
#[utoipa::path(
    post,
    path = "/cover-letters/render",
    request_body = RenderRequest,
    responses(
        (status = 200, description = "Letter with placeholders filled", body = RenderedLetter),
        (status = 400, description = "Empty job description", body = ErrorBody),
        (status = 502, description = "LLM failure", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "cover-letters"
)]
pub async fn render_letter(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    ApiJson(req): ApiJson<RenderRequest>,
) -> Result<Json<RenderedLetter>, AppError> {
    let job_description = req.job_description.trim();
    if job_description.is_empty() {
        return Err(AppError::Validation("job_description must not be empty".to_string()));
    }

    let content_json = serde_json::to_string_pretty(&req.content)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize content: {e}")))?;
    let text = state
        .llm
        .call_text(&render_prompt(job_description, &content_json), PLAIN_TEXT_SYSTEM)
        .await?;
    let unresolved_placeholders = extract_placeholders(&text);
    if !unresolved_placeholders.is_empty() {
        info!(
            count = unresolved_placeholders.len(),
            "Rendered letter still has placeholders"
        );
    }

    Ok(Json(RenderedLetter {
        text,
        unresolved_placeholders,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn existing() -> CoverLetterRow {
        CoverLetterRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Backend".to_string(),
            content: SqlJson(CoverLetterContent {
                introduction: "Hello".to_string(),
                body_part_1: "Skills".to_string(),
                body_part_2: "Why you".to_string(),
                conclusion: "Thanks".to_string(),
            }),
            status: "archived".to_string(),
            job_title: Some("Engineer".to_string()),
            company_name: Some("Acme".to_string()),
            tags: vec!["rust".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_sure"), "%100\\%\\_sure%");
    }

    #[test]
    fn test_empty_update_detected() {
        let update: CoverLetterUpdate = serde_json::from_value(json!({})).unwrap();
        assert!(update.is_empty());
        let update: CoverLetterUpdate = serde_json::from_value(json!({"tags": []})).unwrap();
        assert!(!update.is_empty());
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let update = CoverLetterUpdate {
            name: Some(" Platform ".to_string()),
            ..Default::default()
        };
        let fields = CoverLetterFields::merge(existing(), update).unwrap();
        assert_eq!(fields.name, "Platform");
        assert_eq!(fields.company_name.as_deref(), Some("Acme"));
        assert_eq!(fields.tags, vec!["rust"]);
        assert_eq!(fields.content.conclusion, "Thanks");
    }

    #[test]
    fn test_merge_blank_company_clears_it() {
        let update = CoverLetterUpdate {
            company_name: Some("  ".to_string()),
            ..Default::default()
        };
        let fields = CoverLetterFields::merge(existing(), update).unwrap();
        assert_eq!(fields.company_name, None);
    }

    #[test]
    fn test_merge_validates_new_content() {
        let mut content = existing().content.0;
        content.introduction = String::new();
        let update = CoverLetterUpdate {
            content: Some(content),
            ..Default::default()
        };
        assert!(CoverLetterFields::merge(existing(), update).is_err());
    }

    #[test]
    fn test_create_dedups_tags() {
        let req: CoverLetterCreate = serde_json::from_value(json!({
            "name": "Backend",
            "content": {
                "introduction": "a", "body_part_1": "b", "body_part_2": "c", "conclusion": "d"
            },
            "tags": ["rust", "rust", "remote"]
        }))
        .unwrap();
        assert!(req.status.is_none());
        let fields = CoverLetterFields::from_create(req).unwrap();
        assert_eq!(fields.tags, vec!["rust", "remote"]);
    }
}
