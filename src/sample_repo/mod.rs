// SQLite store for slow-request samples. Samples are insert-only: no update
// path, and the core never deletes rows.

pub mod listcodec;

use crate::models::{Browser, Category, DeviceType, NewSample, Sample, SummaryCounts};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Filter for raw listing and counting. Search matches a URL substring.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub category: Option<Category>,
    pub search: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

pub struct SampleRepo {
    pool: SqlitePool,
}

impl SampleRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recorded_at INTEGER NOT NULL,
                ttfb_ms INTEGER NOT NULL,
                category TEXT NOT NULL,
                url TEXT NOT NULL,
                query_params TEXT NULL,
                cookies TEXT NULL,
                user_role TEXT NOT NULL DEFAULT '',
                country TEXT NOT NULL DEFAULT '',
                device_type TEXT NOT NULL DEFAULT '',
                browser TEXT NOT NULL DEFAULT '',
                referrer TEXT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_samples_recorded_at ON samples(recorded_at)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_samples_category ON samples(category)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_samples_ttfb ON samples(ttfb_ms)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts one sample and returns its row id. List fields go through the
    /// list codec; an empty list is stored as NULL, not "[]".
    #[instrument(skip(self, sample), fields(repo = "samples", operation = "insert"))]
    pub async fn insert(&self, sample: &NewSample) -> anyhow::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO samples (recorded_at, ttfb_ms, category, url, query_params, cookies, user_role, country, device_type, browser, referrer)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(sample.recorded_at.timestamp())
        .bind(sample.ttfb_ms)
        .bind(sample.category.as_str())
        .bind(&sample.url)
        .bind(listcodec::encode(&sample.query_params))
        .bind(listcodec::encode(&sample.cookies))
        .bind(&sample.user_role)
        .bind(&sample.country)
        .bind(sample.device_type.as_str())
        .bind(sample.browser.as_str())
        .bind(&sample.referrer)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Paged listing, newest-recorded first.
    #[instrument(skip(self), fields(repo = "samples", operation = "list"))]
    pub async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Sample>> {
        let per_page = filter.per_page.max(1) as i64;
        let offset = (filter.page.max(1) as i64 - 1) * per_page;

        let mut sql = String::from("SELECT * FROM samples WHERE 1=1");
        push_filter_clauses(&mut sql, filter);
        sql.push_str(" ORDER BY recorded_at DESC, id DESC LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        query = bind_filter(query, filter);
        query = query.bind(per_page).bind(offset);

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(parse_sample_row).collect()
    }

    /// Total rows matching the filter (paging ignored).
    pub async fn count(&self, filter: &ListFilter) -> anyhow::Result<i64> {
        let mut sql = String::from("SELECT COUNT(*) FROM samples WHERE 1=1");
        push_filter_clauses(&mut sql, filter);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        query = bind_filter_scalar(query, filter);
        Ok(query.fetch_one(&self.pool).await?)
    }

    /// Per-category counts within [start, end], both bounds inclusive.
    /// Empty windows yield zeroes.
    #[instrument(skip(self), fields(repo = "samples", operation = "summary_counts"))]
    pub async fn summary_counts(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<SummaryCounts> {
        let rows = sqlx::query(
            "SELECT category, COUNT(*) AS total FROM samples
             WHERE recorded_at BETWEEN $1 AND $2 GROUP BY category",
        )
        .bind(start.timestamp())
        .bind(end.timestamp())
        .fetch_all(&self.pool)
        .await?;

        let mut counts = SummaryCounts::default();
        for row in rows {
            let category: String = row.try_get("category")?;
            let total: i64 = row.try_get("total")?;
            match Category::from_stored(&category) {
                Category::Warning => counts.warning = total,
                Category::Bad => counts.bad = total,
            }
        }
        Ok(counts)
    }

    /// Bad samples in [start, end] inclusive, slowest first. Ties keep
    /// insertion order (id ascending).
    #[instrument(skip(self), fields(repo = "samples", operation = "top_slowest"))]
    pub async fn top_slowest(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<Sample>> {
        let rows = sqlx::query(
            "SELECT * FROM samples
             WHERE recorded_at BETWEEN $1 AND $2 AND category = 'bad'
             ORDER BY ttfb_ms DESC, id ASC LIMIT $3",
        )
        .bind(start.timestamp())
        .bind(end.timestamp())
        .bind(limit.max(1) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_sample_row).collect()
    }
}

fn push_filter_clauses(sql: &mut String, filter: &ListFilter) {
    if filter.category.is_some() {
        sql.push_str(" AND category = ?");
    }
    if filter.search.as_deref().is_some_and(|s| !s.is_empty()) {
        sql.push_str(" AND url LIKE ? ESCAPE '\\'");
    }
}

fn bind_filter<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    filter: &'q ListFilter,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    if let Some(category) = filter.category {
        query = query.bind(category.as_str());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        query = query.bind(like_pattern(search));
    }
    query
}

fn bind_filter_scalar<'q>(
    mut query: sqlx::query::QueryScalar<'q, sqlx::Sqlite, i64, sqlx::sqlite::SqliteArguments<'q>>,
    filter: &'q ListFilter,
) -> sqlx::query::QueryScalar<'q, sqlx::Sqlite, i64, sqlx::sqlite::SqliteArguments<'q>> {
    if let Some(category) = filter.category {
        query = query.bind(category.as_str());
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        query = query.bind(like_pattern(search));
    }
    query
}

/// Escape LIKE metacharacters in user-supplied search text.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn parse_sample_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<Sample> {
    let recorded_at: i64 = row.try_get("recorded_at")?;
    let category: String = row.try_get("category")?;
    let query_params: Option<String> = row.try_get("query_params")?;
    let cookies: Option<String> = row.try_get("cookies")?;
    let device_type: String = row.try_get("device_type")?;
    let browser: String = row.try_get("browser")?;
    let referrer: Option<String> = row.try_get("referrer")?;

    Ok(Sample {
        id: row.try_get("id")?,
        recorded_at: DateTime::from_timestamp(recorded_at, 0).unwrap_or(DateTime::UNIX_EPOCH),
        ttfb_ms: row.try_get("ttfb_ms")?,
        category: Category::from_stored(&category),
        url: row.try_get("url")?,
        query_params: listcodec::decode(query_params.as_deref()),
        cookies: listcodec::decode(cookies.as_deref()),
        user_role: row.try_get("user_role")?,
        country: row.try_get("country")?,
        device_type: DeviceType::parse(&device_type),
        browser: Browser::parse(&browser),
        referrer: referrer.unwrap_or_default(),
    })
}
