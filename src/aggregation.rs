// Aggregation engine: summary counts + similarity groupings over a time
// window of stored samples. Pure and read-only; shared by the insights view
// and the daily email. Grouping over the top-slowest set stays in memory,
// count/top queries stay in sample_repo.

use crate::models::{Sample, SimilarityGroup, SimilarityReport, WindowSummary};
use crate::sample_repo::SampleRepo;
use chrono::{DateTime, Days, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// How many bad samples feed the top-slowest list and similarity grouping.
pub const TOP_SLOWEST_LIMIT: u32 = 50;
/// Groups reported per similarity field.
pub const MAX_GROUPS: usize = 5;
/// Bucket label for samples where the grouped field is empty.
pub const NONE_LABEL: &str = "None";

/// Computes the aggregate view of [start, end]. Empty windows produce zero
/// counts and empty lists, never an error.
pub async fn summarize(
    repo: &SampleRepo,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<WindowSummary> {
    let counts = repo.summary_counts(start, end).await?;
    let top_slowest = repo.top_slowest(start, end, TOP_SLOWEST_LIMIT).await?;
    let similarity = similarity_report(&top_slowest);
    Ok(WindowSummary {
        start,
        end,
        counts,
        top_slowest,
        similarity,
    })
}

pub fn similarity_report(samples: &[Sample]) -> SimilarityReport {
    SimilarityReport {
        by_url: group_by(samples, |s| s.url.clone()),
        by_query_params: group_by(samples, |s| render_list(&s.query_params)),
        by_cookies: group_by(samples, |s| render_list(&s.cookies)),
    }
}

/// Comma-joined display form of a stored list field. Empty list renders
/// as an empty string; the "None" marker is applied at grouping time.
pub fn render_list(items: &[String]) -> String {
    items.join(", ")
}

/// Buckets samples by the exact rendered field value, counts and averages
/// each bucket, and returns the MAX_GROUPS largest. Sort is stable: buckets
/// with equal counts keep first-seen order.
pub fn group_by<F>(samples: &[Sample], field: F) -> Vec<SimilarityGroup>
where
    F: Fn(&Sample) -> String,
{
    struct Bucket {
        label: String,
        count: i64,
        ttfb_sum: i64,
    }

    let mut buckets: Vec<Bucket> = Vec::new();
    for sample in samples {
        let mut label = field(sample).trim().to_string();
        if label.is_empty() {
            label = NONE_LABEL.to_string();
        }
        match buckets.iter_mut().find(|b| b.label == label) {
            Some(bucket) => {
                bucket.count += 1;
                bucket.ttfb_sum += sample.ttfb_ms;
            }
            None => buckets.push(Bucket {
                label,
                count: 1,
                ttfb_sum: sample.ttfb_ms,
            }),
        }
    }

    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets.truncate(MAX_GROUPS);
    buckets
        .into_iter()
        .map(|b| SimilarityGroup {
            label: b.label,
            count: b.count,
            average: ((b.ttfb_sum as f64) / (b.count.max(1) as f64)).round() as i64,
        })
        .collect()
}

/// Insights window: local midnight seven days back, up to now. UTC out.
pub fn trailing_week_window<Tz: TimeZone>(now: DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_date = now.date_naive() - Days::new(7);
    let start = at_local(&now.timezone(), start_date.and_time(NaiveTime::MIN));
    (start.with_timezone(&Utc), now.with_timezone(&Utc))
}

/// Email window: the previous full local calendar day, 00:00:00 through
/// 23:59:59. UTC out.
pub fn previous_day_window<Tz: TimeZone>(now: DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let yesterday = now.date_naive() - Days::new(1);
    let start_naive = yesterday.and_time(NaiveTime::MIN);
    let end_naive = start_naive + Duration::days(1) - Duration::seconds(1);
    let tz = now.timezone();
    (
        at_local(&tz, start_naive).with_timezone(&Utc),
        at_local(&tz, end_naive).with_timezone(&Utc),
    )
}

/// Resolve a naive local time; for times skipped by a DST jump, fall back
/// to reading the naive value as UTC.
fn at_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt,
        None => tz.from_utc_datetime(&naive),
    }
}
