mod auth;
mod config;
mod cover_letters;
mod db;
mod errors;
mod extract;
mod job_flows;
mod job_queries;
mod llm_client;
mod models;
mod openapi;
mod pagination;
mod resumes;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::tokens::TokenService;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Joba API v{}", env!("CARGO_PKG_VERSION"));
    info!(?config, "Configuration loaded");

    // Runs pending migrations.
    let db = create_pool(&config.database_url).await?;

    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    let s3 = build_s3_client(&config).await;
    let files = Arc::new(S3FileStore::new(s3, config.s3_bucket.clone()));
    info!(bucket = %config.s3_bucket, "S3 file store initialized");

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let tokens = TokenService::new(
        &config.jwt_secret,
        config.access_token_ttl_hours,
        config.refresh_token_ttl_days,
    );

    let state = AppState {
        db,
        redis,
        files,
        llm,
        config: config.clone(),
        tokens,
        started_at: Instant::now(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// S3 client for MinIO locally or AWS in production; the endpoint decides which.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "joba-static",
    );

    let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
