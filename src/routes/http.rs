// Handlers: ingest, raw listing, insights, version.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::{AppState, COUNTRY_HEADER, ROLE_HEADER, TOKEN_HEADER};
use crate::aggregation;
use crate::classifier::{self, IngestError, IngestOutcome, RequestContext};
use crate::models::Category;
use crate::sample_repo::ListFilter;
use crate::version::{NAME, VERSION};

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// POST /api/log — ingest one measurement from the browser probe.
/// Requires the anti-forgery token or an authenticated session.
pub(super) async fn log_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<crate::models::IngestPayload>,
) -> Response {
    let role = header_str(&headers, ROLE_HEADER);
    let token_ok = header_str(&headers, TOKEN_HEADER)
        .is_some_and(|t| t == state.config.server.ingest_token);
    if !token_ok && role.is_none() {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "invalid security token" })),
        )
            .into_response();
    }

    let ctx = RequestContext {
        role: role.map(String::from),
        country: header_str(&headers, COUNTRY_HEADER).map(String::from),
    };

    match classifier::classify_and_store(&state.repo, &payload, &ctx, &state.config.thresholds)
        .await
    {
        Ok(IngestOutcome::BelowThreshold) => (
            StatusCode::OK,
            Json(serde_json::json!({ "logged": false, "reason": "below-threshold" })),
        )
            .into_response(),
        Ok(IngestOutcome::Logged(category)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "logged": true, "category": category })),
        )
            .into_response(),
        Err(IngestError::Validation(reason)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": reason })),
        )
            .into_response(),
        Err(IngestError::Store(e)) => {
            tracing::warn!(error = %e, "sample insert failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "failed to store measurement" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct LogsQuery {
    category: Option<String>,
    search: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

/// GET /api/logs — paged raw listing, newest first.
pub(super) async fn logs_handler(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Response {
    let filter = ListFilter {
        category: query.category.as_deref().and_then(parse_category),
        search: query.search,
        page: query.page.unwrap_or(1).max(1),
        per_page: query.per_page.unwrap_or(20).clamp(1, 100),
    };

    let total = match state.repo.count(&filter).await {
        Ok(n) => n,
        Err(e) => return internal_error(e, "count failed"),
    };
    match state.repo.list(&filter).await {
        Ok(entries) => Json(serde_json::json!({
            "total": total,
            "page": filter.page,
            "perPage": filter.per_page,
            "entries": entries,
        }))
        .into_response(),
        Err(e) => internal_error(e, "listing failed"),
    }
}

/// GET /api/insights — aggregate view of the trailing seven days
/// (local midnight aligned).
pub(super) async fn insights_handler(State(state): State<AppState>) -> Response {
    let (start, end) = aggregation::trailing_week_window(chrono::Local::now());
    match aggregation::summarize(&state.repo, start, end).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => internal_error(e, "summarize failed"),
    }
}

fn parse_category(s: &str) -> Option<Category> {
    match s {
        "warning" => Some(Category::Warning),
        "bad" => Some(Category::Bad),
        _ => None,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
}

fn internal_error(e: anyhow::Error, what: &str) -> Response {
    tracing::warn!(error = %e, what);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "internal error" })),
    )
        .into_response()
}
