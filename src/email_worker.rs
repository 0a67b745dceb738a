// Daily summary email: cron-scheduled (local time) job that runs the
// previous calendar day through the aggregation engine and sends one
// plain-text report. A failed send is logged, never retried.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregation;
use crate::config::{EmailConfig, ThresholdConfig};
use crate::mailer::MailSender;
use crate::models::{SimilarityGroup, WindowSummary};
use crate::sample_repo::SampleRepo;
use chrono::{DateTime, TimeZone};
use tracing::{info, warn};

/// Spawns the email worker. Returns a join handle; the loop runs until the
/// task is dropped or aborted.
pub fn spawn(
    repo: Arc<SampleRepo>,
    mailer: Arc<dyn MailSender>,
    email: EmailConfig,
    thresholds: ThresholdConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, mailer, email, thresholds).await;
    })
}

async fn run(
    repo: Arc<SampleRepo>,
    mailer: Arc<dyn MailSender>,
    email: EmailConfig,
    thresholds: ThresholdConfig,
) {
    if !email.enabled {
        info!("daily summary email disabled");
        return;
    }
    let Ok(schedule) = cron::Schedule::from_str(&email.schedule) else {
        warn!(cron = %email.schedule, "invalid email.schedule; daily summary will not run");
        return;
    };
    loop {
        let now = chrono::Local::now();
        let Some(next) = schedule.after(&now).next() else {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            continue;
        };
        let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
        tokio::time::sleep(delay).await;

        match send_summary_for(
            &repo,
            mailer.as_ref(),
            &email,
            &thresholds,
            chrono::Local::now(),
        )
        .await
        {
            Ok(true) => info!("daily summary sent"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "daily summary failed"),
        }
    }
}

/// Builds and sends the summary for the day before `now`. Returns false when
/// skipped (disabled or no recipients), true when handed to the mailer.
pub async fn send_summary_for<Tz: TimeZone>(
    repo: &SampleRepo,
    mailer: &dyn MailSender,
    email: &EmailConfig,
    thresholds: &ThresholdConfig,
    now: DateTime<Tz>,
) -> anyhow::Result<bool>
where
    Tz::Offset: fmt::Display,
{
    if !email.enabled {
        return Ok(false);
    }
    let recipients = email.recipient_list();
    if recipients.is_empty() {
        tracing::debug!("daily summary skipped: no recipients");
        return Ok(false);
    }

    let tz = now.timezone();
    let (start, end) = aggregation::previous_day_window(now);
    let summary = aggregation::summarize(repo, start, end).await?;
    let (subject, body) = build_summary(&summary, thresholds, &tz);

    mailer.send(&recipients, &subject, &body)?;
    Ok(true)
}

/// Renders the plain-text summary. Window timestamps display in the given
/// timezone; the subject names the summarized day.
pub fn build_summary<Tz: TimeZone>(
    summary: &WindowSummary,
    thresholds: &ThresholdConfig,
    tz: &Tz,
) -> (String, String)
where
    Tz::Offset: fmt::Display,
{
    let start_local = summary.start.with_timezone(tz);
    let end_local = summary.end.with_timezone(tz);

    let subject = format!("TTFB summary for {}", start_local.format("%B %-d, %Y"));

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(
        "Monitoring window: {} - {}",
        start_local.format("%Y-%m-%d %H:%M"),
        end_local.format("%Y-%m-%d %H:%M"),
    ));
    lines.push(String::new());
    lines.push("Totals:".into());
    lines.push(format!(
        "- Warnings (> {}ms): {}",
        thresholds.warning_ms, summary.counts.warning
    ));
    lines.push(format!(
        "- Slow (>= {}ms): {}",
        thresholds.bad_ms, summary.counts.bad
    ));
    lines.push(String::new());
    lines.push("Top slowest requests:".into());

    if summary.top_slowest.is_empty() {
        lines.push("No slow requests logged yesterday.".into());
    } else {
        for (index, sample) in summary.top_slowest.iter().enumerate() {
            lines.push(format!(
                "{}. {} ms - {}",
                index + 1,
                sample.ttfb_ms,
                sample.url
            ));
        }
    }

    lines.push(String::new());
    lines.push("Similarity hints:".into());
    push_similarity_section(&mut lines, "By URL", &summary.similarity.by_url);
    push_similarity_section(
        &mut lines,
        "By query params",
        &summary.similarity.by_query_params,
    );
    push_similarity_section(&mut lines, "By cookies", &summary.similarity.by_cookies);

    (subject, lines.join("\n"))
}

fn push_similarity_section(lines: &mut Vec<String>, label: &str, groups: &[SimilarityGroup]) {
    lines.push(format!("{}:", label));
    if groups.is_empty() {
        lines.push("No data.".into());
    } else {
        for group in groups {
            lines.push(format!(
                "- {} - {} hits (avg {} ms)",
                group.label, group.count, group.average
            ));
        }
    }
    lines.push(String::new());
}
