use std::sync::Arc;
use std::time::Instant;

use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::auth::tokens::TokenService;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::storage::FileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Used by the health check for PING and the database status cache.
    pub redis: RedisClient,
    /// Resume file storage. S3 in production, in-memory in tests.
    pub files: Arc<dyn FileStore>,
    pub llm: LlmClient,
    pub config: Config,
    pub tokens: TokenService,
    pub started_at: Instant,
}
