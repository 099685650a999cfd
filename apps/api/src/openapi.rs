//! OpenAPI document for every route, served at `/openapi.json` and `/docs`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /auth/signin or /auth/signup."))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Joba API",
        description = "Job-application management: accounts, resumes, cover letters, job queries and job flows."
    ),
    paths(
        crate::routes::health::welcome,
        crate::routes::health::health_handler,
        // Auth
        crate::auth::handlers::signup,
        crate::auth::handlers::signin,
        crate::auth::handlers::refresh,
        crate::auth::handlers::me,
        crate::auth::handlers::check_availability,
        crate::auth::handlers::onboarding,
        // Resumes
        crate::resumes::handlers::upload_resume,
        crate::resumes::handlers::list_resumes,
        crate::resumes::handlers::get_resume,
        crate::resumes::handlers::download_resume,
        crate::resumes::handlers::update_resume_status,
        crate::resumes::handlers::process_resume,
        crate::resumes::handlers::analyze,
        crate::resumes::handlers::delete_resume,
        // Cover letters
        crate::cover_letters::handlers::list_cover_letters,
        crate::cover_letters::handlers::create_cover_letter,
        crate::cover_letters::handlers::get_cover_letter,
        crate::cover_letters::handlers::update_cover_letter,
        crate::cover_letters::handlers::update_cover_letter_status,
        crate::cover_letters::handlers::delete_cover_letter,
        crate::cover_letters::handlers::generate_section,
        crate::cover_letters::handlers::render_letter,
        // Job queries
        crate::job_queries::handlers::list_job_queries,
        crate::job_queries::handlers::create_job_query,
        crate::job_queries::handlers::get_job_query,
        crate::job_queries::handlers::update_job_query,
        crate::job_queries::handlers::update_job_query_status,
        crate::job_queries::handlers::delete_job_query,
        crate::job_queries::handlers::generate_job_query,
        // Job flows
        crate::job_flows::handlers::create_job_flow,
        crate::job_flows::handlers::list_job_flows,
        crate::job_flows::handlers::get_job_flow,
        crate::job_flows::handlers::update_job_flow,
        crate::job_flows::handlers::update_job_flow_status,
        crate::job_flows::handlers::delete_job_flow,
    ),
    components(schemas(
        crate::errors::ErrorBody,
        crate::errors::ErrorDetail,
        crate::pagination::PaginationInfo,
        crate::pagination::ResumePage,
        crate::pagination::CoverLetterPage,
        crate::pagination::JobQueryPage,
        crate::pagination::JobFlowPage,
        crate::models::DeletedResponse,
        crate::models::user::UserRow,
        crate::models::resume::ResumeRow,
        crate::models::resume::ResumeStatus,
        crate::models::cover_letter::CoverLetterRow,
        crate::models::cover_letter::CoverLetterContent,
        crate::models::cover_letter::CoverLetterStatus,
        crate::models::cover_letter::ContentSection,
        crate::models::job_query::JobQueryRow,
        crate::models::job_query::JobQueryKeywords,
        crate::models::job_query::JobQueryStatus,
        crate::models::job_flow::JobFlowRow,
        crate::models::job_flow::JobFlowSource,
        crate::models::job_flow::JobFlowStatus,
        crate::routes::health::HealthReport,
        crate::routes::health::Components,
        crate::routes::health::ComponentHealth,
        // Auth DTOs
        crate::auth::tokens::TokenPair,
        crate::auth::users::AvailabilityResponse,
        crate::auth::handlers::SignupRequest,
        crate::auth::handlers::SigninRequest,
        crate::auth::handlers::RefreshRequest,
        crate::auth::handlers::AvailabilityRequest,
        crate::auth::handlers::OnboardingRequest,
        // Resume DTOs
        crate::resumes::handlers::ResumeUpload,
        crate::resumes::handlers::ResumeStatusUpdate,
        crate::resumes::analysis::ResumeAnalysis,
        crate::resumes::analysis::ResumeScoring,
        crate::resumes::analysis::ResumeFeedback,
        // Cover letter DTOs
        crate::cover_letters::handlers::CoverLetterCreate,
        crate::cover_letters::handlers::CoverLetterUpdate,
        crate::cover_letters::handlers::CoverLetterStatusUpdate,
        crate::cover_letters::handlers::GenerateRequest,
        crate::cover_letters::handlers::GeneratedText,
        crate::cover_letters::handlers::RenderRequest,
        crate::cover_letters::handlers::RenderedLetter,
        // Job query DTOs
        crate::job_queries::handlers::JobQueryCreate,
        crate::job_queries::handlers::JobQueryUpdate,
        crate::job_queries::handlers::JobQueryStatusUpdate,
        crate::job_queries::handlers::GenerateKeywordsRequest,
        crate::job_queries::handlers::GeneratedJobQuery,
        // Job flow DTOs
        crate::job_flows::handlers::JobFlowCreate,
        crate::job_flows::handlers::JobFlowUpdate,
        crate::job_flows::handlers::JobFlowStatusUpdate,
        crate::job_flows::handlers::JobFlowSummary,
        crate::job_flows::handlers::ResumeRef,
        crate::job_flows::handlers::CoverLetterRef,
        crate::job_flows::handlers::JobQueryRef,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and dependency status"),
        (name = "auth", description = "Accounts and tokens"),
        (name = "resumes", description = "Resume files, extraction and scoring"),
        (name = "cover-letters", description = "Cover letters and LLM writing"),
        (name = "job-queries", description = "Saved boolean job searches"),
        (name = "job-flows", description = "Resume + cover letter + query bundles"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/auth/signup",
            "/auth/check-availability",
            "/resumes/upload",
            "/resumes/{id}/download",
            "/cover-letters/render",
            "/job-queries/generate",
            "/job-flows/{id}/status",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
