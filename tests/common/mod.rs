// Shared test helpers

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use ttfbmon::models::*;
use ttfbmon::sample_repo::SampleRepo;

pub async fn test_repo() -> (TempDir, SampleRepo) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("samples.db");
    let repo = SampleRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub fn new_sample(ttfb_ms: i64, url: &str, recorded_at: DateTime<Utc>) -> NewSample {
    NewSample {
        recorded_at,
        ttfb_ms,
        category: if ttfb_ms >= 1800 {
            Category::Bad
        } else {
            Category::Warning
        },
        url: url.into(),
        query_params: vec![],
        cookies: vec![],
        user_role: "guest".into(),
        country: String::new(),
        device_type: DeviceType::Desktop,
        browser: Browser::Other,
        referrer: String::new(),
    }
}
