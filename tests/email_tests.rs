// Daily summary email tests: skip rules, body rendering, windowing

mod common;

use chrono::Utc;
use common::{new_sample, test_repo, ts};
use std::sync::Mutex;
use ttfbmon::config::{EmailConfig, ThresholdConfig};
use ttfbmon::email_worker::{build_summary, send_summary_for};
use ttfbmon::mailer::MailSender;
use ttfbmon::models::{SimilarityReport, SummaryCounts, WindowSummary};

#[derive(Default)]
struct CapturingMailer {
    sent: Mutex<Vec<(Vec<String>, String, String)>>,
}

impl MailSender for CapturingMailer {
    fn send(&self, to: &[String], subject: &str, body: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_vec(), subject.into(), body.into()));
        Ok(())
    }
}

fn email_config(enabled: bool, recipients: &str) -> EmailConfig {
    EmailConfig {
        enabled,
        recipients: recipients.into(),
        ..Default::default()
    }
}

// 2026-08-28 10:15:30 UTC; yesterday is 2026-08-27.
fn now() -> chrono::DateTime<Utc> {
    ts(1787912130)
}

#[tokio::test]
async fn disabled_email_is_skipped() {
    let (_dir, repo) = test_repo().await;
    let mailer = CapturingMailer::default();
    let sent = send_summary_for(
        &repo,
        &mailer,
        &email_config(false, "ops@example.com"),
        &ThresholdConfig::default(),
        now(),
    )
    .await
    .unwrap();
    assert!(!sent);
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_recipients_is_skipped() {
    let (_dir, repo) = test_repo().await;
    let mailer = CapturingMailer::default();
    let sent = send_summary_for(
        &repo,
        &mailer,
        &email_config(true, " , "),
        &ThresholdConfig::default(),
        now(),
    )
    .await
    .unwrap();
    assert!(!sent);
}

#[tokio::test]
async fn summary_covers_previous_day_only() {
    let (_dir, repo) = test_repo().await;
    // Inside yesterday (2026-08-27 12:00 UTC).
    repo.insert(&new_sample(2000, "/slow", ts(1787832000))).await.unwrap();
    repo.insert(&new_sample(900, "/warn", ts(1787832060))).await.unwrap();
    // Today; must not be counted.
    repo.insert(&new_sample(2400, "/today", ts(1787911000))).await.unwrap();

    let mailer = CapturingMailer::default();
    let sent = send_summary_for(
        &repo,
        &mailer,
        &email_config(true, "ops@example.com, perf@example.com"),
        &ThresholdConfig::default(),
        now(),
    )
    .await
    .unwrap();
    assert!(sent);

    let messages = mailer.sent.lock().unwrap();
    let (to, subject, body) = &messages[0];
    assert_eq!(to, &vec!["ops@example.com".to_string(), "perf@example.com".to_string()]);
    assert_eq!(subject, "TTFB summary for August 27, 2026");
    assert!(body.contains("- Warnings (> 800ms): 1"));
    assert!(body.contains("- Slow (>= 1800ms): 1"));
    assert!(body.contains("1. 2000 ms - /slow"));
    assert!(!body.contains("/today"));
    assert!(body.contains("By URL:"));
    assert!(body.contains("- /slow - 1 hits (avg 2000 ms)"));
    // Empty list fields bucket under the None marker.
    assert!(body.contains("By query params:\n- None - 1 hits (avg 2000 ms)"));
}

#[test]
fn empty_summary_renders_placeholders() {
    let summary = WindowSummary {
        start: ts(1787788800),
        end: ts(1787875199),
        counts: SummaryCounts::default(),
        top_slowest: vec![],
        similarity: SimilarityReport::default(),
    };
    let (subject, body) = build_summary(&summary, &ThresholdConfig::default(), &Utc);
    assert_eq!(subject, "TTFB summary for August 27, 2026");
    assert!(body.contains("No slow requests logged yesterday."));
    assert!(body.contains("By URL:\nNo data."));
    assert!(body.contains("By cookies:\nNo data."));
    assert!(body.contains("Monitoring window: 2026-08-27 00:00 - 2026-08-27 23:59"));
}
