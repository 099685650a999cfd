use axum::{
    extract::{Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::errors::{AppError, ErrorBody};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::resume::{ResumeRow, ResumeStatus};
use crate::models::DeletedResponse;
use crate::pagination::{PageParams, Paginated};
use crate::resumes::analysis::{analyze_resume, ResumeAnalysis};
use crate::resumes::processing::{extract_text, parse_resume};
use crate::state::AppState;
use crate::storage::{content_type_for, object_key, validate_upload, FileStore};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ResumeListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<ResumeStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResumeStatusUpdate {
    pub status: ResumeStatus,
}

/// Multipart form with a single `file` part.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ResumeUpload {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Loads a resume owned by `user_id`; anything else is reported as missing.
pub async fn find_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> Result<ResumeRow, AppError> {
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))
}

async fn read_file_field(multipart: &mut Multipart, max_bytes: usize) -> Result<UploadedFile, AppError> {
    let too_large = || {
        AppError::Validation(format!(
            "File too large. Maximum size: {}MB",
            max_bytes / (1024 * 1024)
        ))
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Uploaded file has no name".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                too_large()
            } else {
                AppError::Validation(format!("Invalid multipart body: {e}"))
            }
        })?;
        return Ok(UploadedFile {
            filename,
            content_type,
            data,
        });
    }
    Err(AppError::Validation("Missing multipart field 'file'".to_string()))
}

/// Text extraction plus LLM parsing; `None` when either step fails.
async fn try_parse(state: &AppState, data: Bytes, ext: &str, resume_id: Uuid) -> Option<Value> {
    let parsed = async {
        let text = extract_text(data, ext).await?;
        parse_resume(&state.llm, &text).await
    }
    .await;
    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(resume_id = %resume_id, "Resume extraction failed: {e}");
            None
        }
    }
}

/// POST /resumes/upload
#[utoipa::path(
    post,
    path = "/resumes/upload",
    request_body(content = ResumeUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Resume stored", body = ResumeRow),
        (status = 400, description = "Invalid file type, empty or too large", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "resumes"
)]
pub async fn upload_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    let max_bytes = state.config.max_upload_bytes;
    let file = read_file_field(&mut multipart, max_bytes).await?;
    let ext = validate_upload(&file.filename, file.data.len(), max_bytes)?;

    let resume_id = Uuid::new_v4();
    let key = object_key(user.id, resume_id, &ext);
    let content_type = file
        .content_type
        .filter(|c| !c.is_empty() && c != "application/octet-stream")
        .unwrap_or_else(|| content_type_for(&ext).to_string());
    let size = file.data.len() as i64;

    state
        .files
        .put(&key, file.data.clone(), &content_type, &file.filename)
        .await?;

    let parsed_data = try_parse(&state, file.data, &ext, resume_id).await;

    let inserted = sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes (id, user_id, filename, file_key, content_type, size_bytes, status, parsed_data)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(resume_id)
    .bind(user.id)
    .bind(&file.filename)
    .bind(&key)
    .bind(&content_type)
    .bind(size)
    .bind(ResumeStatus::Active.as_str())
    .bind(&parsed_data)
    .fetch_one(&state.db)
    .await;

    let resume = match inserted {
        Ok(row) => row,
        Err(e) => {
            if let Err(cleanup) = state.files.delete(&key).await {
                warn!("Failed to remove orphaned file {key}: {cleanup}");
            }
            return Err(e.into());
        }
    };

    info!(
        resume_id = %resume.id,
        user_id = %user.id,
        parsed = resume.parsed_data.is_some(),
        "Resume uploaded"
    );
    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /resumes/list
#[utoipa::path(
    get,
    path = "/resumes/list",
    params(ResumeListQuery),
    responses(
        (status = 200, description = "Page of resumes, newest first", body = crate::pagination::ResumePage),
        (status = 400, description = "Invalid paging parameters", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "resumes"
)]
pub async fn list_resumes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<ResumeListQuery>,
) -> Result<Json<Paginated<ResumeRow>>, AppError> {
    let page = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .validate()?;
    let status = query.status.map(|s| s.as_str());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM resumes WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(user.id)
    .bind(status)
    .fetch_one(&state.db)
    .await?;

    let list = sqlx::query_as::<_, ResumeRow>(
        r#"
        SELECT * FROM resumes
        WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
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

/// GET /resumes/:id
#[utoipa::path(
    get,
    path = "/resumes/{id}",
    params(("id" = Uuid, Path, description = "Resume ID")),
    responses(
        (status = 200, description = "Resume", body = ResumeRow),
        (status = 404, description = "Resume not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "resumes"
)]
pub async fn get_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ResumeRow>, AppError> {
    Ok(Json(find_owned(&state.db, id, user.id).await?))
}

/// GET /resumes/:id/download
#[utoipa::path(
    get,
    path = "/resumes/{id}/download",
    params(("id" = Uuid, Path, description = "Resume ID")),
    responses(
        (status = 200, description = "Original file", content_type = "application/octet-stream"),
        (status = 404, description = "Resume or file not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "resumes"
)]
pub async fn download_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let resume = find_owned(&state.db, id, user.id).await?;
    let file = state.files.get(&resume.file_key).await?;

    let content_type = HeaderValue::from_str(&resume.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&resume.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.data,
    )
        .into_response())
}

/// `attachment` header with an ASCII fallback name and an RFC 5987 UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    if fallback == filename {
        return format!("attachment; filename=\"{fallback}\"");
    }
    let encoded: String = filename
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect();
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// PATCH /resumes/:id/status
#[utoipa::path(
    patch,
    path = "/resumes/{id}/status",
    params(("id" = Uuid, Path, description = "Resume ID")),
    request_body = ResumeStatusUpdate,
    responses(
        (status = 200, description = "Updated resume", body = ResumeRow),
        (status = 404, description = "Resume not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "resumes"
)]
pub async fn update_resume_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ResumeStatusUpdate>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = sqlx::query_as::<_, ResumeRow>(
        "UPDATE resumes SET status = $1, updated_at = now() WHERE id = $2 AND user_id = $3 RETURNING *",
    )
    .bind(req.status.as_str())
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;
    Ok(Json(resume))
}

/// POST /resumes/:id/process
#[utoipa::path(
    post,
    path = "/resumes/{id}/process",
    params(("id" = Uuid, Path, description = "Resume ID")),
    responses(
        (status = 200, description = "Resume with refreshed parsed data", body = ResumeRow),
        (status = 404, description = "Resume not found", body = ErrorBody),
        (status = 422, description = "No text could be extracted", body = ErrorBody),
        (status = 502, description = "LLM failure", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "resumes"
)]
pub async fn process_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = find_owned(&state.db, id, user.id).await?;
    let ext = crate::storage::file_extension(&resume.filename).unwrap_or_default();
    let file = state.files.get(&resume.file_key).await?;

    let text = extract_text(file.data, &ext).await?;
    let parsed = parse_resume(&state.llm, &text).await?;

    let resume = sqlx::query_as::<_, ResumeRow>(
        "UPDATE resumes SET parsed_data = $1, updated_at = now() WHERE id = $2 AND user_id = $3 RETURNING *",
    )
    .bind(&parsed)
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;

    info!(resume_id = %id, "Resume re-processed");
    Ok(Json(resume))
}

/// POST /resumes/:id/analyze
#[utoipa::path(
    post,
    path = "/resumes/{id}/analyze",
    params(("id" = Uuid, Path, description = "Resume ID")),
    responses(
        (status = 200, description = "Scores and feedback", body = ResumeAnalysis),
        (status = 404, description = "Resume not found", body = ErrorBody),
        (status = 422, description = "Resume has no parsed data", body = ErrorBody),
        (status = 502, description = "LLM failure", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "resumes"
)]
pub async fn analyze(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ResumeAnalysis>, AppError> {
    let resume = find_owned(&state.db, id, user.id).await?;
    let parsed = require_parsed(&resume)?;
    let analysis = analyze_resume(&state.llm, parsed).await?;
    info!(
        resume_id = %id,
        total_score = analysis.scoring.total_score,
        "Resume analyzed"
    );
    Ok(Json(analysis))
}

/// Parsed data of a resume, or 422 when extraction never succeeded.
pub fn require_parsed(resume: &ResumeRow) -> Result<&Value, AppError> {
    resume.parsed_data.as_ref().ok_or_else(|| {
        AppError::UnprocessableEntity(
            "Resume has no parsed data; process it first".to_string(),
        )
    })
}

/// DELETE /resumes/:id
#[utoipa::path(
    delete,
    path = "/resumes/{id}",
    params(("id" = Uuid, Path, description = "Resume ID")),
    responses(
        (status = 200, description = "Resume and file deleted", body = DeletedResponse),
        (status = 404, description = "Resume not found", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "resumes"
)]
pub async fn delete_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let resume = find_owned(&state.db, id, user.id).await?;

    sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?;

    remove_stored_file(state.files.as_ref(), &resume.file_key).await;

    info!(resume_id = %id, "Resume deleted");
    Ok(Json(DeletedResponse::new("Resume", id)))
}

/// Best-effort removal once the row is gone; a leftover object is only logged.
async fn remove_stored_file(files: &dyn FileStore, key: &str) {
    match files.delete(key).await {
        Ok(()) | Err(AppError::NotFound(_)) => {}
        Err(e) => warn!("Failed to remove stored file {key}: {e}"),
    }
}
