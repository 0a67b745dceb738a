// Domain models for slow-request samples and aggregation output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on stored query-param keys and cookie names per sample.
pub const MAX_LIST_ENTRIES: usize = 20;

/// Severity tier of a stored sample. Rows at or below the warning
/// threshold are never stored, so there is no "ok" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Warning,
    Bad,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Warning => "warning",
            Category::Bad => "bad",
        }
    }

    /// Parse the stored TEXT value. Unknown values fall back to Warning
    /// (legacy-tolerant read; stored rows are never rejected).
    pub fn from_stored(s: &str) -> Self {
        match s {
            "bad" => Category::Bad,
            "warning" => Category::Warning,
            other => {
                tracing::debug!(value = other, "unknown category in store, using warning");
                Category::Warning
            }
        }
    }
}

/// Client device class, substring-matched from the user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
        }
    }

    /// Parse free text from the client; anything unrecognized is desktop.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "mobile" => DeviceType::Mobile,
            "tablet" => DeviceType::Tablet,
            _ => DeviceType::Desktop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Browser {
    Chrome,
    Edge,
    Safari,
    Firefox,
    Other,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "Chrome",
            Browser::Edge => "Edge",
            Browser::Safari => "Safari",
            Browser::Firefox => "Firefox",
            Browser::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "Chrome" => Browser::Chrome,
            "Edge" => Browser::Edge,
            "Safari" => Browser::Safari,
            "Firefox" => Browser::Firefox,
            _ => Browser::Other,
        }
    }
}

/// One persisted slow-request observation. Immutable once stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub ttfb_ms: i64,
    pub category: Category,
    pub url: String,
    /// Query parameter keys, first-seen order, no duplicates, at most 20.
    pub query_params: Vec<String>,
    /// Cookie names, same rules as query_params.
    pub cookies: Vec<String>,
    pub user_role: String,
    pub country: String,
    pub device_type: DeviceType,
    pub browser: Browser,
    pub referrer: String,
}

/// A sample as produced by the classifier, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewSample {
    pub recorded_at: DateTime<Utc>,
    pub ttfb_ms: i64,
    pub category: Category,
    pub url: String,
    pub query_params: Vec<String>,
    pub cookies: Vec<String>,
    pub user_role: String,
    pub country: String,
    pub device_type: DeviceType,
    pub browser: Browser,
    pub referrer: String,
}

/// Inbound ingest body from the browser probe. ttfb and url are required;
/// everything else defaults per the classifier rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestPayload {
    pub ttfb: i64,
    pub url: String,
    pub timestamp: Option<String>,
    pub query_param_keys: Option<Vec<String>>,
    pub cookie_names: Option<Vec<String>>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub warning: i64,
    pub bad: i64,
}

/// One similarity bucket: samples sharing an exact field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarityGroup {
    pub label: String,
    pub count: i64,
    /// Rounded mean ttfb_ms of the bucket.
    pub average: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityReport {
    pub by_url: Vec<SimilarityGroup>,
    pub by_query_params: Vec<SimilarityGroup>,
    pub by_cookies: Vec<SimilarityGroup>,
}

/// Aggregate view of one time window. Recomputed on every request, never cached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub counts: SummaryCounts,
    pub top_slowest: Vec<Sample>,
    pub similarity: SimilarityReport,
}
