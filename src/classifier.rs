// Ingest classifier: validates and normalizes an inbound measurement,
// decides whether it is stored, and derives the severity category.
// The caller is trusted; authorization happens at the HTTP boundary.

use crate::config::ThresholdConfig;
use crate::models::{Browser, Category, DeviceType, IngestPayload, MAX_LIST_ENTRIES, NewSample};
use crate::sample_repo::SampleRepo;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid payload: {0}")]
    Validation(String),
    #[error("store failure: {0}")]
    Store(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// ttfb at or below the warning threshold; nothing stored.
    BelowThreshold,
    Logged(Category),
}

/// Request-scoped identity signals resolved by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// First role of the authenticated user, if any.
    pub role: Option<String>,
    /// Country code from the edge header, if present.
    pub country: Option<String>,
}

/// Derive the severity category. The client-side threshold is advisory;
/// the boundaries here are authoritative (>warning to store, >=bad for bad).
pub fn categorize(ttfb_ms: i64, thresholds: &ThresholdConfig) -> Option<Category> {
    if ttfb_ms <= thresholds.warning_ms {
        return None;
    }
    if ttfb_ms >= thresholds.bad_ms {
        Some(Category::Bad)
    } else {
        Some(Category::Warning)
    }
}

pub async fn classify_and_store(
    repo: &SampleRepo,
    payload: &IngestPayload,
    ctx: &RequestContext,
    thresholds: &ThresholdConfig,
) -> Result<IngestOutcome, IngestError> {
    let Some(category) = categorize(payload.ttfb, thresholds) else {
        return Ok(IngestOutcome::BelowThreshold);
    };

    let url = sanitize_url(&payload.url);
    if url.is_empty() {
        return Err(IngestError::Validation("url is missing or unusable".into()));
    }
    let referrer = sanitize_url(payload.referrer.as_deref().unwrap_or(""));

    let device_type = DeviceType::parse(&sanitize_text(
        payload.device_type.as_deref().unwrap_or(""),
    ));
    let browser = Browser::parse(&sanitize_text(payload.browser.as_deref().unwrap_or("")));

    let query_params = sanitize_list(payload.query_param_keys.as_deref().unwrap_or(&[]));
    let cookies = sanitize_list(payload.cookie_names.as_deref().unwrap_or(&[]));

    let user_role = ctx
        .role
        .as_deref()
        .map(sanitize_text)
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "guest".into());
    let country = normalize_country(ctx.country.as_deref().unwrap_or(""));
    let recorded_at = normalize_timestamp(payload.timestamp.as_deref(), Utc::now());

    let sample = NewSample {
        recorded_at,
        ttfb_ms: payload.ttfb,
        category,
        url,
        query_params,
        cookies,
        user_role,
        country,
        device_type,
        browser,
        referrer,
    };

    repo.insert(&sample).await.map_err(IngestError::Store)?;
    Ok(IngestOutcome::Logged(category))
}

/// Per-entry text sanitize, empties dropped, order-preserving dedupe, cap 20.
pub fn sanitize_list(entries: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in entries {
        let clean = sanitize_text(entry);
        if clean.is_empty() || out.contains(&clean) {
            continue;
        }
        out.push(clean);
        if out.len() >= MAX_LIST_ENTRIES {
            break;
        }
    }
    out
}

/// Strip control characters and collapse whitespace runs to single spaces.
pub fn sanitize_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.trim().chars() {
        if c.is_control() {
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// Keep http(s) and site-relative URLs; anything else (javascript:, data:,
/// garbage) drops to empty.
pub fn sanitize_url(s: &str) -> String {
    let trimmed: String = s.trim().chars().filter(|c| !c.is_control()).collect();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || trimmed.starts_with('/') {
        trimmed
    } else {
        String::new()
    }
}

/// Uppercase and truncate the edge-provided country code to 3 characters.
pub fn normalize_country(s: &str) -> String {
    sanitize_text(s).to_uppercase().chars().take(3).collect()
}

/// Client timestamp if it parses as RFC 3339, else ingest time. Second
/// precision either way.
pub fn normalize_timestamp(timestamp: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let parsed = timestamp
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now);
    DateTime::from_timestamp(parsed.timestamp(), 0).unwrap_or(DateTime::UNIX_EPOCH)
}
