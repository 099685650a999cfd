use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, Json};
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;
use utoipa::ToSchema;

use crate::state::AppState;

const DB_TIMEOUT: Duration = Duration::from_secs(3);
const REDIS_TIMEOUT: Duration = Duration::from_secs(2);
const DB_CACHE_KEY: &str = "joba:health:database";
const DB_CACHE_TTL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    /// `up` or `down`.
    pub status: String,
    pub latency_ms: u64,
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Components {
    pub database: ComponentHealth,
    pub redis: ComponentHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    /// `healthy`, `degraded` or `unhealthy`.
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Components,
}

/// GET /
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Welcome message")),
    tag = "health"
)]
pub async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to Joba API" }))
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Healthy or degraded (Redis down)", body = HealthReport),
        (status = 503, description = "Database unreachable", body = HealthReport),
    ),
    tag = "health"
)]
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let (mut redis_conn, redis) = check_redis(&state.redis).await;

    let database = match redis_conn.as_mut() {
        Some(conn) => match cached_database(conn).await {
            Some(cached) => cached,
            None => {
                let fresh = check_database(&state.db).await;
                if cacheable(&fresh) {
                    store_database(conn, &fresh).await;
                }
                fresh
            }
        },
        None => check_database(&state.db).await,
    };

    let (code, status) = overall_status(database.status == "up", redis.status == "up");
    if code != StatusCode::OK || status != "healthy" {
        warn!(status, database = %database.status, redis = %redis.status, "Health check not healthy");
    }

    (
        code,
        Json(HealthReport {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
            components: Components { database, redis },
        }),
    )
}

/// Database down is fatal; Redis down only degrades the service.
pub fn overall_status(database_up: bool, redis_up: bool) -> (StatusCode, &'static str) {
    match (database_up, redis_up) {
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
        (true, false) => (StatusCode::OK, "degraded"),
        (true, true) => (StatusCode::OK, "healthy"),
    }
}

fn component(up: bool, started: Instant) -> ComponentHealth {
    ComponentHealth {
        status: if up { "up" } else { "down" }.to_string(),
        latency_ms: started.elapsed().as_millis() as u64,
        cached: false,
    }
}

async fn check_database(db: &sqlx::PgPool) -> ComponentHealth {
    let started = Instant::now();
    let result = tokio::time::timeout(DB_TIMEOUT, sqlx::query("SELECT 1").execute(db)).await;
    let up = match result {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!("Database health check failed: {e}");
            false
        }
        Err(_) => {
            warn!("Database health check timed out after {}s", DB_TIMEOUT.as_secs());
            false
        }
    };
    component(up, started)
}

/// Connects and PINGs; the connection is reused for the database cache.
async fn check_redis(client: &redis::Client) -> (Option<MultiplexedConnection>, ComponentHealth) {
    let started = Instant::now();
    let ping = async {
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok::<_, redis::RedisError>(conn)
    };
    match tokio::time::timeout(REDIS_TIMEOUT, ping).await {
        Ok(Ok(conn)) => (Some(conn), component(true, started)),
        Ok(Err(e)) => {
            warn!("Redis health check failed: {e}");
            (None, component(false, started))
        }
        Err(_) => {
            warn!("Redis health check timed out");
            (None, component(false, started))
        }
    }
}

/// Only a healthy result is cached; an outage is re-checked on every request.
fn cacheable(health: &ComponentHealth) -> bool {
    health.status == "up"
}

async fn cached_database(conn: &mut MultiplexedConnection) -> Option<ComponentHealth> {
    let raw = redis::cmd("GET")
        .arg(DB_CACHE_KEY)
        .query_async::<_, Option<String>>(conn)
        .await
        .ok()??;
    let mut health: ComponentHealth = serde_json::from_str(&raw).ok()?;
    if !cacheable(&health) {
        return None;
    }
    health.cached = true;
    Some(health)
}

async fn store_database(conn: &mut MultiplexedConnection, health: &ComponentHealth) {
    let Ok(raw) = serde_json::to_string(health) else {
        return;
    };
    let stored = redis::cmd("SET")
        .arg(DB_CACHE_KEY)
        .arg(raw)
        .arg("EX")
        .arg(DB_CACHE_TTL_SECS)
        .query_async::<_, ()>(conn)
        .await;
    if let Err(e) = stored {
        warn!("Failed to cache database health: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status() {
        assert_eq!(overall_status(true, true), (StatusCode::OK, "healthy"));
        assert_eq!(overall_status(true, false), (StatusCode::OK, "degraded"));
        assert_eq!(
            overall_status(false, true),
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        );
        assert_eq!(
            overall_status(false, false),
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        );
    }

    #[test]
    fn test_component_health_cache_round_trip() {
        let health = component(true, Instant::now());
        let raw = serde_json::to_string(&health).unwrap();
        let back: ComponentHealth = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.status, "up");
        assert!(!back.cached);
    }

    #[test]
    fn test_only_healthy_database_is_cacheable() {
        assert!(cacheable(&component(true, Instant::now())));
        assert!(!cacheable(&component(false, Instant::now())));
    }

    #[tokio::test]
    async fn test_welcome_message() {
        let Json(body) = welcome().await;
        assert_eq!(body["message"], "Welcome to Joba API");
    }
}
