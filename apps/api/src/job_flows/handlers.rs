use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use sqlx::{FromRow, PgPool};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::errors::{AppError, ErrorBody};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::cover_letter::CoverLetterContent;
use crate::models::job_flow::{JobFlowRow, JobFlowSource, JobFlowStatus};
use crate::models::DeletedResponse;
use crate::pagination::{PageParams, Paginated};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct JobFlowListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<JobFlowStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct JobFlowCreate {
    pub resume_id: Uuid,
    pub cover_letter_id: Uuid,
    pub job_query_id: Uuid,
    pub source: JobFlowSource,
    pub status: Option<JobFlowStatus>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct JobFlowUpdate {
    pub resume_id: Option<Uuid>,
    pub cover_letter_id: Option<Uuid>,
    pub job_query_id: Option<Uuid>,
    pub source: Option<JobFlowSource>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct JobFlowStatusUpdate {
    pub status: JobFlowStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResumeRef {
    pub id: Uuid,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CoverLetterRef {
    pub id: Uuid,
    pub name: String,
    pub content: Option<CoverLetterContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobQueryRef {
    pub id: Uuid,
    pub name: String,
    pub query: String,
}

/// List item: the flow plus the names of what it points at. A referenced
/// item that was deleted shows up with its id and empty fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobFlowSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resume_id: Uuid,
    pub cover_letter_id: Uuid,
    pub job_query_id: Uuid,
    pub source: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resume: ResumeRef,
    pub cover_letter: CoverLetterRef,
    pub job_query: JobQueryRef,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    flow: JobFlowRow,
    resume_filename: Option<String>,
    cover_letter_name: Option<String>,
    cover_letter_content: Option<SqlJson<CoverLetterContent>>,
    job_query_name: Option<String>,
    job_query_query: Option<String>,
}

impl From<SummaryRow> for JobFlowSummary {
    fn from(row: SummaryRow) -> Self {
        let flow = row.flow;
        Self {
            resume: ResumeRef {
                id: flow.resume_id,
                filename: row.resume_filename.unwrap_or_default(),
            },
            cover_letter: CoverLetterRef {
                id: flow.cover_letter_id,
                name: row.cover_letter_name.unwrap_or_default(),
                content: row.cover_letter_content.map(|c| c.0),
            },
            job_query: JobQueryRef {
                id: flow.job_query_id,
                name: row.job_query_name.unwrap_or_default(),
                query: row.job_query_query.unwrap_or_default(),
            },
            id: flow.id,
            user_id: flow.user_id,
            resume_id: flow.resume_id,
            cover_letter_id: flow.cover_letter_id,
            job_query_id: flow.job_query_id,
            source: flow.source,
            status: flow.status,
            created_at: flow.created_at,
            updated_at: flow.updated_at,
        }
    }
}

/// Items a flow can point at, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    Resume,
    CoverLetter,
    JobQuery,
}

impl Reference {
    fn table(&self) -> &'static str {
        match self {
            Self::Resume => "resumes",
            Self::CoverLetter => "cover_letters",
            Self::JobQuery => "job_queries",
        }
    }

    fn not_found(&self) -> AppError {
        let what = match self {
            Self::Resume => "Resume",
            Self::CoverLetter => "Cover letter",
            Self::JobQuery => "Job query",
        };
        AppError::NotFound(format!("{what} not found"))
    }
}

/// The references to verify, resume first; `None` entries are skipped.
fn references_to_check(
    resume_id: Option<Uuid>,
    cover_letter_id: Option<Uuid>,
    job_query_id: Option<Uuid>,
) -> Vec<(Reference, Uuid)> {
    [
        (Reference::Resume, resume_id),
        (Reference::CoverLetter, cover_letter_id),
        (Reference::JobQuery, job_query_id),
    ]
    .into_iter()
    .filter_map(|(kind, id)| id.map(|id| (kind, id)))
    .collect()
}

/// Fails with the first reference that does not exist or belongs to someone else.
async fn ensure_owned(db: &PgPool, user_id: Uuid, refs: &[(Reference, Uuid)]) -> Result<(), AppError> {
    for (kind, id) in refs {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND user_id = $2)",
            kind.table()
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_one(db)
            .await?;
        if !exists {
            return Err(kind.not_found());
        }
    }
    Ok(())
}

async fn find_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<JobFlowRow, AppError> {
    sqlx::query_as::<_, JobFlowRow>("SELECT * FROM job_flows WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job flow not found".to_string()))
}

/// POST /job-flows
#[utoipa::path(
    post,
    path = "/job-flows",
    request_body = JobFlowCreate,
    responses(
        (status = 201, description = "Job flow created", body = JobFlowRow),
        (status = 404, description = "Resume, cover letter or job query not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-flows"
)]
pub async fn create_job_flow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<JobFlowCreate>,
) -> Result<(StatusCode, Json<JobFlowRow>), AppError> {
    let refs = references_to_check(
        Some(req.resume_id),
        Some(req.cover_letter_id),
        Some(req.job_query_id),
    );
    ensure_owned(&state.db, user.id, &refs).await?;

    let status = req.status.unwrap_or(JobFlowStatus::Active);
    let flow = sqlx::query_as::<_, JobFlowRow>(
        r#"
        INSERT INTO job_flows (id, user_id, resume_id, cover_letter_id, job_query_id, source, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(req.resume_id)
    .bind(req.cover_letter_id)
    .bind(req.job_query_id)
    .bind(req.source.as_str())
    .bind(status.as_str())
    .fetch_one(&state.db)
    .await?;

    info!(job_flow_id = %flow.id, source = %flow.source, "Job flow created");
    Ok((StatusCode::CREATED, Json(flow)))
}

/// GET /job-flows/list
#[utoipa::path(
    get,
    path = "/job-flows/list",
    params(JobFlowListQuery),
    responses(
        (status = 200, description = "Page of job flow summaries, active first then newest", body = crate::pagination::JobFlowPage),
        (status = 400, description = "Invalid paging parameters", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-flows"
)]
pub async fn list_job_flows(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<JobFlowListQuery>,
) -> Result<Json<Paginated<JobFlowSummary>>, AppError> {
    let page = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .validate()?;
    let status = query.status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM job_flows WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(user.id)
    .bind(status)
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, SummaryRow>(
        r#"
        SELECT f.*,
               r.filename  AS resume_filename,
               c.name      AS cover_letter_name,
               c.content   AS cover_letter_content,
               q.name      AS job_query_name,
               q.query     AS job_query_query
        FROM job_flows f
        LEFT JOIN resumes r       ON r.id = f.resume_id       AND r.user_id = f.user_id
        LEFT JOIN cover_letters c ON c.id = f.cover_letter_id AND c.user_id = f.user_id
        LEFT JOIN job_queries q   ON q.id = f.job_query_id    AND q.user_id = f.user_id
        WHERE f.user_id = $1 AND ($2::text IS NULL OR f.status = $2)
        ORDER BY f.status ASC, f.created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user.id)
    .bind(status)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&state.db)
    .await?;

    let list = rows.into_iter().map(JobFlowSummary::from).collect();
    Ok(Json(Paginated::new(list, total, page)))
}

/// GET /job-flows/:id
#[utoipa::path(
    get,
    path = "/job-flows/{id}",
    params(("id" = Uuid, Path, description = "Job flow ID")),
    responses(
        (status = 200, description = "Job flow", body = JobFlowRow),
        (status = 404, description = "Job flow not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-flows"
)]
pub async fn get_job_flow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<JobFlowRow>, AppError> {
    Ok(Json(find_owned(&state.db, id, user.id).await?))
}

/// PATCH /job-flows/:id
#[utoipa::path(
    patch,
    path = "/job-flows/{id}",
    params(("id" = Uuid, Path, description = "Job flow ID")),
    request_body = JobFlowUpdate,
    responses(
        (status = 200, description = "Updated job flow", body = JobFlowRow),
        (status = 400, description = "Empty update", body = ErrorBody),
        (status = 404, description = "Job flow or referenced item not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-flows"
)]
pub async fn update_job_flow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<JobFlowUpdate>,
) -> Result<Json<JobFlowRow>, AppError> {
    let refs = references_to_check(req.resume_id, req.cover_letter_id, req.job_query_id);
    if refs.is_empty() && req.source.is_none() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    let existing = find_owned(&state.db, id, user.id).await?;
    ensure_owned(&state.db, user.id, &refs).await?;

    let flow = sqlx::query_as::<_, JobFlowRow>(
        r#"
        UPDATE job_flows
        SET resume_id = $1, cover_letter_id = $2, job_query_id = $3, source = $4, updated_at = now()
        WHERE id = $5 AND user_id = $6
        RETURNING *
        "#,
    )
    .bind(req.resume_id.unwrap_or(existing.resume_id))
    .bind(req.cover_letter_id.unwrap_or(existing.cover_letter_id))
    .bind(req.job_query_id.unwrap_or(existing.job_query_id))
    .bind(req.source.map(|s| s.as_str().to_string()).unwrap_or(existing.source))
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Job flow not found".to_string()))?;

    Ok(Json(flow))
}

/// PATCH /job-flows/:id/status
#[utoipa::path(
    patch,
    path = "/job-flows/{id}/status",
    params(("id" = Uuid, Path, description = "Job flow ID")),
    request_body = JobFlowStatusUpdate,
    responses(
        (status = 200, description = "Updated job flow", body = JobFlowRow),
        (status = 404, description = "Job flow not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-flows"
)]
pub async fn update_job_flow_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<JobFlowStatusUpdate>,
) -> Result<Json<JobFlowRow>, AppError> {
    let flow = sqlx::query_as::<_, JobFlowRow>(
        "UPDATE job_flows SET status = $1, updated_at = now() WHERE id = $2 AND user_id = $3 RETURNING *",
    )
    .bind(req.status.as_str())
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Job flow not found".to_string()))?;
    Ok(Json(flow))
}

/// DELETE /job-flows/:id
#[utoipa::path(
    delete,
    path = "/job-flows/{id}",
    params(("id" = Uuid, Path, description = "Job flow ID")),
    responses(
        (status = 200, description = "Job flow deleted", body = DeletedResponse),
        (status = 404, description = "Job flow not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "job-flows"
)]
pub async fn delete_job_flow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let result = sqlx::query("DELETE FROM job_flows WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Job flow not found".to_string()));
    }
    info!(job_flow_id = %id, "Job flow deleted");
    Ok(Json(DeletedResponse::new("Job flow", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flow() -> JobFlowRow {
        JobFlowRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            resume_id: Uuid::new_v4(),
            cover_letter_id: Uuid::new_v4(),
            job_query_id: Uuid::new_v4(),
            source: "linkedin".to_string(),
            status: "active".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_references_checked_in_fixed_order() {
        let (r, c, q) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let refs = references_to_check(Some(r), Some(c), Some(q));
        assert_eq!(
            refs,
            vec![
                (Reference::Resume, r),
                (Reference::CoverLetter, c),
                (Reference::JobQuery, q)
            ]
        );
    }

    #[test]
    fn test_partial_update_checks_only_given_references() {
        let q = Uuid::new_v4();
        assert_eq!(references_to_check(None, None, Some(q)), vec![(Reference::JobQuery, q)]);
        assert!(references_to_check(None, None, None).is_empty());
    }

    #[test]
    fn test_not_found_names_the_reference() {
        match Reference::CoverLetter.not_found() {
            AppError::NotFound(msg) => assert_eq!(msg, "Cover letter not found"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_summary_of_deleted_references_is_empty() {
        let row = SummaryRow {
            flow: flow(),
            resume_filename: None,
            cover_letter_name: None,
            cover_letter_content: None,
            job_query_name: None,
            job_query_query: None,
        };
        let resume_id = row.flow.resume_id;
        let summary = JobFlowSummary::from(row);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["resume"], json!({"id": resume_id, "filename": ""}));
        assert_eq!(json["cover_letter"]["name"], "");
        assert!(json["cover_letter"]["content"].is_null());
        assert_eq!(json["job_query"]["query"], "");
        assert_eq!(json["source"], "linkedin");
    }

    #[test]
    fn test_summary_carries_reference_fields() {
        let row = SummaryRow {
            flow: flow(),
            resume_filename: Some("cv.pdf".to_string()),
            cover_letter_name: Some("Backend".to_string()),
            cover_letter_content: Some(SqlJson(CoverLetterContent {
                introduction: "Hi".to_string(),
                body_part_1: "a".to_string(),
                body_part_2: "b".to_string(),
                conclusion: "Bye".to_string(),
            })),
            job_query_name: Some("Rust".to_string()),
            job_query_query: Some("Rust AND Remote".to_string()),
        };
        let summary = JobFlowSummary::from(row);
        assert_eq!(summary.resume.filename, "cv.pdf");
        assert_eq!(summary.cover_letter.content.unwrap().introduction, "Hi");
        assert_eq!(summary.job_query.query, "Rust AND Remote");
    }

    #[test]
    fn test_create_rejects_unknown_source() {
        let body = json!({
            "resume_id": Uuid::new_v4(),
            "cover_letter_id": Uuid::new_v4(),
            "job_query_id": Uuid::new_v4(),
            "source": "indeed"
        });
        assert!(serde_json::from_value::<JobFlowCreate>(body).is_err());
    }
}
