// Client probe logic: one TTFB measurement per page load, reported at most
// once when it exceeds the warning threshold. Modeled here so the gate and
// signal-extraction rules are testable; the browser runs the same rules.
// Transmission is fire-and-forget: the send callback's failures are the
// caller's to swallow, never retried.

use crate::models::{Browser, DeviceType, MAX_LIST_ENTRIES};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// The navigation-timing fields the measurement needs. Zeroed fields mean
/// the browser had no usable entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationTiming {
    pub request_start: f64,
    pub response_start: f64,
}

/// Page-load environment the probe samples its signals from.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub url: String,
    pub cookie_header: String,
    pub user_agent: String,
    pub referrer: String,
}

/// The payload sent to the ingest endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub ttfb: i64,
    pub url: String,
    pub timestamp: String,
    pub query_param_keys: Vec<String>,
    pub cookie_names: Vec<String>,
    pub device_type: DeviceType,
    pub browser: Browser,
    pub referrer: String,
}

/// Per-page-load reporter. Two measurement pathways (observer callback and
/// load-event fallback) may race; the sent flag is flipped before the send
/// callback runs, so at most one report goes out.
pub struct Probe {
    warning_threshold_ms: f64,
    sent: AtomicBool,
}

impl Probe {
    pub fn new(warning_threshold_ms: f64) -> Self {
        Self {
            warning_threshold_ms,
            sent: AtomicBool::new(false),
        }
    }

    /// Feeds one measurement pathway. Returns true if a report was handed to
    /// `send`. No timing, zeroed timing, or a TTFB at or below the threshold
    /// emits nothing and leaves the gate open for the other pathway.
    pub fn observe<F>(
        &self,
        timing: Option<&NavigationTiming>,
        page: &PageContext,
        now: DateTime<Utc>,
        send: F,
    ) -> bool
    where
        F: FnOnce(Report),
    {
        let Some(ttfb) = timing.and_then(ttfb_ms) else {
            return false;
        };
        if ttfb <= self.warning_threshold_ms {
            return false;
        }
        if self.sent.swap(true, Ordering::SeqCst) {
            return false;
        }

        send(Report {
            ttfb: ttfb.round() as i64,
            url: page.url.clone(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            query_param_keys: query_param_keys(&page.url),
            cookie_names: cookie_names(&page.cookie_header),
            device_type: detect_device(&page.user_agent),
            browser: detect_browser(&page.user_agent),
            referrer: page.referrer.clone(),
        });
        true
    }
}

/// responseStart - requestStart; None when either field is missing (zero or
/// negative) or the difference is not positive.
pub fn ttfb_ms(timing: &NavigationTiming) -> Option<f64> {
    if timing.request_start <= 0.0 || timing.response_start <= 0.0 {
        return None;
    }
    let ttfb = timing.response_start - timing.request_start;
    if ttfb > 0.0 { Some(ttfb) } else { None }
}

/// Query parameter names from the page URL, values discarded. First-seen
/// order, no duplicates, at most 20.
pub fn query_param_keys(url: &str) -> Vec<String> {
    let Some(query) = url.split_once('?').map(|(_, rest)| rest) else {
        return Vec::new();
    };
    let query = query.split('#').next().unwrap_or("");
    unique_capped(
        query
            .split('&')
            .map(|pair| pair.split('=').next().unwrap_or("").trim().to_string()),
    )
}

/// Cookie names from the document cookie string, values discarded.
/// Malformed or empty segments are skipped.
pub fn cookie_names(cookie_header: &str) -> Vec<String> {
    unique_capped(
        cookie_header
            .split(';')
            .map(|segment| segment.split('=').next().unwrap_or("").trim().to_string()),
    )
}

/// Mobile pattern first, then tablet, else desktop.
pub fn detect_device(user_agent: &str) -> DeviceType {
    let ua = user_agent.to_lowercase();
    if ua.contains("mobi") || ua.contains("android") {
        DeviceType::Mobile
    } else if ua.contains("tablet") || ua.contains("ipad") {
        DeviceType::Tablet
    } else {
        DeviceType::Desktop
    }
}

pub fn detect_browser(user_agent: &str) -> Browser {
    if user_agent.contains("Chrome/") && !user_agent.contains("Edg/") {
        Browser::Chrome
    } else if user_agent.contains("Edg/") {
        Browser::Edge
    } else if user_agent.contains("Safari/") && !user_agent.contains("Chrome/") {
        Browser::Safari
    } else if user_agent.contains("Firefox/") {
        Browser::Firefox
    } else {
        Browser::Other
    }
}

/// Order-preserving dedupe with the shared 20-entry cap; empties dropped.
fn unique_capped<I: Iterator<Item = String>>(items: I) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if item.is_empty() || out.contains(&item) {
            continue;
        }
        out.push(item);
        if out.len() >= MAX_LIST_ENTRIES {
            break;
        }
    }
    out
}
