use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Shared anti-forgery token the browser probe sends in x-ttfb-log-token.
    pub ingest_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    /// Samples at or below this are never stored.
    #[serde(default = "default_warning_ms")]
    pub warning_ms: i64,
    /// Samples at or above this are categorized "bad".
    #[serde(default = "default_bad_ms")]
    pub bad_ms: i64,
}

fn default_warning_ms() -> i64 {
    800
}

fn default_bad_ms() -> i64 {
    1800
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            warning_ms: default_warning_ms(),
            bad_ms: default_bad_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Comma-separated recipient list.
    #[serde(default)]
    pub recipients: String,
    /// Cron expression (local time) for the daily summary, e.g. "0 0 8 * * *" = 08:00.
    #[serde(default = "default_email_schedule")]
    pub schedule: String,
}

fn default_email_schedule() -> String {
    "0 0 8 * * *".into()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            recipients: String::new(),
            schedule: default_email_schedule(),
        }
    }
}

impl EmailConfig {
    /// Recipients split on commas, trimmed, empties dropped.
    pub fn recipient_list(&self) -> Vec<String> {
        self.recipients
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.server.ingest_token.is_empty(),
            "server.ingest_token must be non-empty"
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.thresholds.warning_ms > 0,
            "thresholds.warning_ms must be > 0, got {}",
            self.thresholds.warning_ms
        );
        anyhow::ensure!(
            self.thresholds.bad_ms > self.thresholds.warning_ms,
            "thresholds.bad_ms must be > warning_ms, got {} <= {}",
            self.thresholds.bad_ms,
            self.thresholds.warning_ms
        );
        if self.email.enabled {
            anyhow::ensure!(
                cron::Schedule::from_str(&self.email.schedule).is_ok(),
                "email.schedule is not a valid cron expression: {}",
                self.email.schedule
            );
        }
        Ok(())
    }
}
