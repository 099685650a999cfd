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
use crate::cover_letters::validation::validate_name;
use crate::errors::{AppError, ErrorBody};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::job_queries::builder::{build_query, normalize_keywords};
use crate::job_queries::prompts::keywords_prompt;
use crate::llm_client::prompts::{candidate_json, JSON_ONLY_SYSTEM};
use crate::models::job_query::{JobQueryKeywords, JobQueryRow, JobQueryStatus};
use crate::models::DeletedResponse;
use crate::pagination::{PageParams, Paginated};
use crate::resumes::handlers::{find_owned as find_owned_resume, require_parsed};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct JobQueryListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<JobQueryStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct JobQueryCreate {
    pub name: String,
    pub keywords: JobQueryKeywords,
    /// Built from `keywords` when empty.
    #[serde(default)]
    pub query: String,
    pub status: Option<JobQueryStatus>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct JobQueryUpdate {
    pub name: Option<String>,
    pub keywords: Option<JobQueryKeywords>,
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct JobQueryStatusUpdate {
    pub status: JobQueryStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateKeywordsRequest {
    pub resume_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GeneratedJobQuery {
    pub keywords: JobQueryKeywords,
    pub query: String,
}

/// Column values after applying an update to an existing query.
#[derive(Debug, PartialEq)]
struct JobQueryFields {
    name: String,
    keywords: JobQueryKeywords,
    query: String,
}

impl JobQueryFields {
    fn from_create(req: JobQueryCreate) -> Result<Self, AppError> {
        let keywords = normalize_keywords(&req.keywords);
        let query = match req.query.trim() {
            "" => build_query(&keywords),
            q => q.to_string(),
        };
        Ok(Self {
            name: validate_name(&req.name)?,
            keywords,
            query,
        })
    }

    /// A keyword change without an explicit query rebuilds the query.
    fn merge(existing: JobQueryRow, req: JobQueryUpdate) -> Result<Self, AppError> {
        let name = match req.name {
            Some(name) => validate_name(&name)?,
            None => existing.name,
        };
        let explicit_query = req
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        let (keywords, query) = match (req.keywords, explicit_query) {
            (Some(keywords), Some(query)) => (normalize_keywords(&keywords), query),
            (Some(keywords), None) => {
                let keywords = normalize_keywords(&keywords);
                let query = build_query(&keywords);
                (keywords, query)
            }
            (None, Some(query)) => (existing.keywords.0, query),
            (None, None) => (existing.keywords.0, existing.query),
        };
        Ok(Self {
            name,
            keywords,
            query,
        })
    }
}

async fn find_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<JobQueryRow, AppError> {
    sqlx::query_as::<_, JobQueryRow>("SELECT * FROM job_queries WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job query not found".to_string()))
}

/// GET /job-queries/list
#[utoipa::path(
    get,
    path = "/job-queries/list",
    params(JobQueryListQuery),
    responses(
        (status = 200, description = "Page of job queries, active first then newest", body = crate::pagination::JobQueryPage),
        (status = 400, description = "Invalid paging parameters", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-queries"
)]
pub async fn list_job_queries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<JobQueryListQuery>,
) -> Result<Json<Paginated<JobQueryRow>>, AppError> {
    let page = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .validate()?;
    let status = query.status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM job_queries WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(user.id)
    .bind(status)
    .fetch_one(&state.db)
    .await?;

    let list = sqlx::query_as::<_, JobQueryRow>(
        r#"
        SELECT * FROM job_queries
        WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
        ORDER BY status ASC, created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user.id)
    .bind(status)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(Paginated::new(list, total, page)))
}

/// POST /job-queries
#[utoipa::path(
    post,
    path = "/job-queries",
    request_body = JobQueryCreate,
    responses(
        (status = 201, description = "Job query created", body = JobQueryRow),
        (status = 400, description = "Validation error", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-queries"
)]
pub async fn create_job_query(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<JobQueryCreate>,
) -> Result<(StatusCode, Json<JobQueryRow>), AppError> {
    let status = req.status.unwrap_or(JobQueryStatus::Archived);
    let fields = JobQueryFields::from_create(req)?;

    let row = sqlx::query_as::<_, JobQueryRow>(
        r#"
        INSERT INTO job_queries (id, user_id, name, keywords, query, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&fields.name)
    .bind(SqlJson(&fields.keywords))
    .bind(&fields.query)
    .bind(status.as_str())
    .fetch_one(&state.db)
    .await?;

    info!(job_query_id = %row.id, "Job query created");
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /job-queries/:id
#[utoipa::path(
    get,
    path = "/job-queries/{id}",
    params(("id" = Uuid, Path, description = "Job query ID")),
    responses(
        (status = 200, description = "Job query", body = JobQueryRow),
        (status = 404, description = "Job query not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-queries"
)]
pub async fn get_job_query(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<JobQueryRow>, AppError> {
    Ok(Json(find_owned(&state.db, id, user.id).await?))
}

/// PATCH /job-queries/:id
#[utoipa::path(
    patch,
    path = "/job-queries/{id}",
    params(("id" = Uuid, Path, description = "Job query ID")),
    request_body = JobQueryUpdate,
    responses(
        (status = 200, description = "Updated job query", body = JobQueryRow),
        (status = 400, description = "Empty or invalid update", body = ErrorBody),
        (status = 404, description = "Job query not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-queries"
)]
pub async fn update_job_query(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<JobQueryUpdate>,
) -> Result<Json<JobQueryRow>, AppError> {
    if req.name.is_none() && req.keywords.is_none() && req.query.is_none() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    let existing = find_owned(&state.db, id, user.id).await?;
    let fields = JobQueryFields::merge(existing, req)?;

    let row = sqlx::query_as::<_, JobQueryRow>(
        r#"
        UPDATE job_queries
        SET name = $1, keywords = $2, query = $3, updated_at = now()
        WHERE id = $4 AND user_id = $5
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(SqlJson(&fields.keywords))
    .bind(&fields.query)
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Job query not found".to_string()))?;

    Ok(Json(row))
}

/// PATCH /job-queries/:id/status
#[utoipa::path(
    patch,
    path = "/job-queries/{id}/status",
    params(("id" = Uuid, Path, description = "Job query ID")),
    request_body = JobQueryStatusUpdate,
    responses(
        (status = 200, description = "Updated job query", body = JobQueryRow),
        (status = 404, description = "Job query not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-queries"
)]
pub async fn update_job_query_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<JobQueryStatusUpdate>,
) -> Result<Json<JobQueryRow>, AppError> {
    let row = sqlx::query_as::<_, JobQueryRow>(
        "UPDATE job_queries SET status = $1, updated_at = now() WHERE id = $2 AND user_id = $3 RETURNING *",
    )
    .bind(req.status.as_str())
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Job query not found".to_string()))?;
    Ok(Json(row))
}

/// DELETE /job-queries/:id
#[utoipa::path(
    delete,
    path = "/job-queries/{id}",
    params(("id" = Uuid, Path, description = "Job query ID")),
    responses(
        (status = 200, description = "Job query deleted", body = DeletedResponse),
        (status = 404, description = "Job query not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-queries"
)]
pub async fn delete_job_query(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let result = sqlx::query("DELETE FROM job_queries WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Job query not found".to_string()));
    }
    info!(job_query_id = %id, "Job query deleted");
    Ok(Json(DeletedResponse::new("Job query", id)))
}

/// POST /job-queries/generate
#[utoipa::path(
    post,
    path = "/job-queries/generate",
    request_body = GenerateKeywordsRequest,
    responses(
        (status = 200, description = "Keywords and the query built from them", body = GeneratedJobQuery),
        (status = 404, description = "Resume not found", body = ErrorBody),
        (status = 422, description = "Resume has no parsed data", body = ErrorBody),
        (status = 502, description = "LLM failure", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-queries"
)]
pub async fn generate_job_query(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<GenerateKeywordsRequest>,
) -> Result<Json<GeneratedJobQuery>, AppError> {
    let resume = find_owned_resume(&state.db, req.resume_id, user.id).await?;
    let parsed = require_parsed(&resume)?;

    let raw: JobQueryKeywords = state
        .llm
        .call_json(&keywords_prompt(&candidate_json(parsed)), JSON_ONLY_SYSTEM)
        .await?;
    let keywords = normalize_keywords(&raw);
    let query = build_query(&keywords);

    info!(resume_id = %resume.id, "Job query keywords generated");
    Ok(Json(GeneratedJobQuery { keywords, query }))
}
