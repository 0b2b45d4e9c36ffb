//! Health check handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use factcheck_common::errors::Result;
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
    /// Reported only; a down cache does not make the reader unready
    pub cache: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn from_ping(name: &str, result: Result<()>, start: Instant) -> Self {
        match result {
            Ok(()) => Self {
                status: "up".to_string(),
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            },
            Err(e) => {
                tracing::warn!(check = name, error = %e, "Readiness check failed");
                Self {
                    status: "down".to_string(),
                    latency_ms: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn is_up(&self) -> bool {
        self.error.is_none()
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: factcheck_common::VERSION.to_string(),
    })
}

/// Readiness check - gated on the database; the cache is informational
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let start = Instant::now();
    let database = CheckResult::from_ping("database", state.news.ping().await, start);

    let start = Instant::now();
    let cache = CheckResult::from_ping("cache", state.news.ping_cache().await, start);

    let ready = database.is_up();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            checks: HealthChecks { database, cache },
        }),
    )
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use axum::http::StatusCode;
    use factcheck_common::cache::testing::FailingCache;
    use factcheck_common::db::MemoryStore;
    use serde_json::Value;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health() {
        let router = test_router(Arc::new(MemoryStore::new()), test_config("/nonexistent"));
        let response = get(router, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("healthy"));
    }

    #[tokio::test]
    async fn test_ready_reports_store_outage() {
        let store = Arc::new(MemoryStore::new());
        let router = test_router(store.clone(), test_config("/nonexistent"));

        let response = get(router.clone(), "/ready").await;
        assert_eq!(response.status(), StatusCode::OK);

        store.set_failing(true);
        let response = get(router, "/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_string(response).await.contains("not_ready"));
    }

    #[tokio::test]
    async fn test_ready_with_cache_down() {
        let store = Arc::new(MemoryStore::new());
        let router = test_router_with_cache(
            store,
            Arc::new(FailingCache::default()),
            test_config("/nonexistent"),
        );

        let api = get(router.clone(), "/api/news").await;
        assert_eq!(api.status(), StatusCode::OK);

        let response = get(router, "/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["database"]["status"], "up");
        assert_eq!(body["checks"]["cache"]["status"], "down");
    }
}
