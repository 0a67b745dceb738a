// HTTP routes

mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::sample_repo::SampleRepo;

/// Anti-forgery token header checked on ingest.
pub const TOKEN_HEADER: &str = "x-ttfb-log-token";
/// Role of the authenticated user, set by the host's auth layer.
pub const ROLE_HEADER: &str = "x-authenticated-role";
/// Best-effort visitor country from the edge.
pub const COUNTRY_HEADER: &str = "cf-ipcountry";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) repo: Arc<SampleRepo>,
    pub(crate) config: AppConfig,
}

pub fn app(repo: Arc<SampleRepo>, config: AppConfig) -> Router {
    let state = AppState { repo, config };
    Router::new()
        .route("/", get(|| async { "ttfbmon: slow TTFB sample collector" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/log", post(http::log_handler)) // POST /api/log
        .route("/api/logs", get(http::logs_handler)) // GET /api/logs
        .route("/api/insights", get(http::insights_handler)) // GET /api/insights
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
