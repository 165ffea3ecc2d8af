use crate::config::is_valid_table_name;
use crate::models::{Category, DomainStat, VisitRecord};
use crate::storage::trait_def::{fold_categories, to_count, to_sql_count, DomainRow};
use crate::storage::{MetricsBackend, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub struct SqliteBackend {
    pool: Arc<SqlitePool>,
    table: String,
}

impl SqliteBackend {
    pub async fn new(database_url: &str, max_connections: u32, table: &str) -> StoreResult<Self> {
        if !is_valid_table_name(table) {
            return Err(StoreError::InvalidConfig(format!(
                "'{table}' is not a valid table name"
            )));
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StoreError::BackendUnreachable)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(StoreError::BackendUnreachable)?;

        Ok(Self {
            pool: Arc::new(pool),
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl MetricsBackend for SqliteBackend {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    async fn init(&self) -> StoreResult<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                url TEXT NOT NULL,
                visit_time INTEGER NOT NULL,
                domain TEXT NOT NULL,
                category TEXT NOT NULL,
                title TEXT,
                visit_count INTEGER NOT NULL DEFAULT 0,
                typed_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (url, visit_time)
            )
            "#,
            table = self.table
        ))
        .execute(self.pool.as_ref())
        .await
        .map_err(StoreError::BackendUnreachable)?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_visit_time ON {table}(visit_time)",
            table = self.table
        ))
        .execute(self.pool.as_ref())
        .await
        .map_err(StoreError::BackendUnreachable)?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_domain ON {table}(domain)",
            table = self.table
        ))
        .execute(self.pool.as_ref())
        .await
        .map_err(StoreError::BackendUnreachable)?;

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(StoreError::BackendUnreachable)?;
        Ok(())
    }

    async fn write_points(&self, records: &[VisitRecord]) -> StoreResult<u64> {
        let upsert = format!(
            r#"
            INSERT INTO {table} (url, visit_time, domain, category, title, visit_count, typed_count)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url, visit_time) DO UPDATE SET
                domain = excluded.domain,
                category = excluded.category,
                title = excluded.title,
                visit_count = excluded.visit_count,
                typed_count = excluded.typed_count
            "#,
            table = self.table
        );

        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for record in records {
            let Some(visit_time) = record.visit_time else {
                continue;
            };

            sqlx::query(&upsert)
                .bind(&record.url)
                .bind(visit_time.timestamp())
                .bind(&record.domain)
                .bind(record.category.as_str())
                .bind(record.title.as_deref())
                .bind(to_sql_count(record.visit_count))
                .bind(to_sql_count(record.typed_count))
                .execute(&mut *tx)
                .await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn domain_stats(&self, since: DateTime<Utc>, limit: usize) -> StoreResult<Vec<DomainStat>> {
        let rows = sqlx::query_as::<_, DomainRow>(&format!(
            r#"
            SELECT
                v.domain AS domain,
                CAST(SUM(v.visit_count) AS INTEGER) AS visit_count,
                MAX(v.visit_time) AS last_visit,
                (
                    SELECT latest.category FROM {table} latest
                    WHERE latest.domain = v.domain AND latest.visit_time >= ?
                    ORDER BY latest.visit_time DESC
                    LIMIT 1
                ) AS category
            FROM {table} v
            WHERE v.visit_time >= ?
            GROUP BY v.domain
            ORDER BY visit_count DESC, domain ASC
            LIMIT ?
            "#,
            table = self.table
        ))
        .bind(since.timestamp())
        .bind(since.timestamp())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(DomainRow::into_stat).collect())
    }

    async fn visited_urls(&self, since: DateTime<Utc>) -> StoreResult<Vec<String>> {
        let urls = sqlx::query_scalar::<_, String>(&format!(
            "SELECT url FROM {table} WHERE visit_time >= ? ORDER BY visit_time DESC",
            table = self.table
        ))
        .bind(since.timestamp())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(urls)
    }

    async fn category_counts(&self, since: DateTime<Utc>) -> StoreResult<BTreeMap<Category, u64>> {
        let rows = sqlx::query_as::<_, (String, i64)>(&format!(
            r#"
            SELECT category, COUNT(*) AS count
            FROM {table}
            WHERE visit_time >= ?
            GROUP BY category
            "#,
            table = self.table
        ))
        .bind(since.timestamp())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(fold_categories(rows))
    }

    async fn hourly_counts(&self, since: DateTime<Utc>) -> StoreResult<BTreeMap<String, u64>> {
        let rows = sqlx::query_as::<_, (i64, i64)>(&format!(
            r#"
            SELECT CAST(strftime('%H', visit_time, 'unixepoch') AS INTEGER) AS hour,
                   COUNT(*) AS count
            FROM {table}
            WHERE visit_time >= ?
            GROUP BY hour
            "#,
            table = self.table
        ))
        .bind(since.timestamp())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(hour, count)| (hour.to_string(), to_count(count)))
            .collect())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE visit_time < ?",
            table = self.table
        ))
        .bind(cutoff.timestamp())
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn point_count(&self) -> StoreResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM {table}",
            table = self.table
        ))
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(to_count(count))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
