//! Fact-check public reader
//!
//! Serves the public side of the fact-check desk:
//! - JSON timeline, search and article detail
//! - Article pages with share metadata injected
//! - Sitemap and the single-page frontend
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use factcheck_common::{
    cache::{CacheStore, MemoryCache, RedisCache, RedisCacheConfig, ResponseCache},
    config::AppConfig,
    db::{DbPool, Repository},
    metrics, NewsService,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub news: Arc<NewsService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    dotenvy::dotenv().ok();
    let config = match std::env::var("APP_CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path),
        Err(_) => AppConfig::load(),
    }
    .context("Failed to load configuration")?;
    let config = Arc::new(config);

    // 2. Setup logging
    init_tracing(&config);
    info!(
        service = %config.observability.service_name,
        "Starting fact-check reader v{}",
        factcheck_common::VERSION
    );

    // 3. Metrics
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(%addr, "Metrics exporter listening");
    }
    metrics::register_metrics();

    // 4. Store and cache
    info!("Connecting to database...");
    let pool = DbPool::new(&config.database).await?;
    let store = Arc::new(Repository::new(pool));

    let cache_store = connect_cache(&config).await;
    info!(backend = cache_store.backend(), "Response cache ready");
    let cache = ResponseCache::new(cache_store, config.news.cache_ttl_secs);

    // 5. App state
    let state = AppState {
        config: config.clone(),
        news: Arc::new(NewsService::new(store, cache, config.news.clone())),
    };

    // 6. Router
    let app = create_router(state);

    // 7. Serve
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, app, config.shutdown_timeout()).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Serve until a shutdown signal, then drain for at most `drain_timeout`
async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    drain_timeout: Duration,
) -> anyhow::Result<()> {
    let signalled = Arc::new(Notify::new());
    let shutdown = {
        let signalled = signalled.clone();
        async move {
            shutdown_signal().await;
            signalled.notify_one();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .into_future();

    tokio::select! {
        result = server => result?,
        _ = async {
            signalled.notified().await;
            tokio::time::sleep(drain_timeout).await;
        } => {
            warn!(timeout_secs = drain_timeout.as_secs(), "Shutdown timed out, dropping open connections");
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Redis when configured and reachable, otherwise an in-process cache
async fn connect_cache(config: &AppConfig) -> Arc<dyn CacheStore> {
    let Some(url) = config.redis.url.clone() else {
        return Arc::new(MemoryCache::new());
    };

    let redis_config = RedisCacheConfig {
        url,
        key_prefix: config.redis.key_prefix.clone(),
    };

    match RedisCache::new(redis_config).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!(error = %e, "Redis unavailable, caching in process");
            Arc::new(MemoryCache::new())
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/", get(handlers::news::list_news))
        .route("/search", get(handlers::news::search_news))
        .route("/{slug}", get(handlers::news::get_news));

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Pages
        .route("/", get(handlers::pages::index))
        .route("/n/{slug}", get(handlers::pages::news_page))
        .route("/sitemap.xml", get(handlers::pages::sitemap))

        .nest("/api/news", api_routes)
        .fallback(handlers::pages::spa_fallback)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::track_requests))
                .layer(TimeoutLayer::new(state.config.request_timeout()))
                .layer(cors_layer(&state.config.server.allowed_origins)),
        )
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use factcheck_common::config::{
        DatabaseConfig, NewsConfig, ObservabilityConfig, RedisConfig, ServerConfig,
    };
    use factcheck_common::db::MemoryStore;
    use tower::ServiceExt;

    pub fn test_config(static_dir: &str) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                allowed_origins: vec!["https://factcheck.example".to_string()],
                static_dir: static_dir.to_string(),
                ..ServerConfig::default()
            },
            database: DatabaseConfig {
                url: "postgres://localhost/unused".to_string(),
                read_url: None,
                max_connections: 1,
                min_connections: 0,
                connect_timeout_secs: 1,
                idle_timeout_secs: 1,
            },
            redis: RedisConfig::default(),
            news: NewsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }

    pub fn test_router(store: Arc<MemoryStore>, config: AppConfig) -> Router {
        test_router_with_cache(store, Arc::new(MemoryCache::new()), config)
    }

    pub fn test_router_with_cache(
        store: Arc<MemoryStore>,
        cache_store: Arc<dyn CacheStore>,
        config: AppConfig,
    ) -> Router {
        let cache = ResponseCache::new(cache_store, config.news.cache_ttl_secs);
        let news = NewsService::new(store, cache, config.news.clone());
        create_router(AppState {
            config: Arc::new(config),
            news: Arc::new(news),
        })
    }

    pub async fn get(router: Router, uri: &str) -> Response<Body> {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
