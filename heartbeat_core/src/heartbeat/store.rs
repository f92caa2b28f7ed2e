//! Durable, ordered heartbeat storage with retention pruning.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::HeartbeatConfig;
use crate::error::{AppError, Result};
use crate::heartbeat::clock::{Clock, SystemClock};
use crate::heartbeat::models::{HeartbeatRecord, HeartbeatStatus};
use crate::telemetry::{traced, SpanRecorder};

const MILLIS_PER_HOUR: u64 = 3_600_000;

#[async_trait]
pub trait HeartbeatStore: Send + Sync {
    /// Ensures the backing structure exists. Safe to call any number of times.
    async fn initialize(&self) -> Result<()>;

    /// Appends a record stamped with the current time and, in the same
    /// transaction, drops every record that fell out of the retention window.
    async fn insert(&self, status: HeartbeatStatus, response_time_ms: u64) -> Result<HeartbeatRecord>;

    /// Most recently inserted record, or `None` when the store is empty.
    async fn latest(&self) -> Result<Option<HeartbeatRecord>>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqliteHeartbeatStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    recorder: Arc<dyn SpanRecorder>,
    retention_ms: i64,
    operation_timeout: Duration,
    write_lock: Mutex<()>,
}

impl SqliteHeartbeatStore {
    pub fn new(pool: SqlitePool, recorder: Arc<dyn SpanRecorder>) -> Self {
        Self::with_config(pool, recorder, &HeartbeatConfig::default())
    }

    pub fn with_config(pool: SqlitePool, recorder: Arc<dyn SpanRecorder>, config: &HeartbeatConfig) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
            recorder,
            retention_ms: i64::try_from(config.retention_hours.saturating_mul(MILLIS_PER_HOUR))
                .unwrap_or(i64::MAX),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(AppError::StorageUnavailable(format!(
                "heartbeat store operation timed out after {}ms",
                self.operation_timeout.as_millis()
            ))),
        }
    }

    async fn create_schema(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS heartbeats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                status TEXT NOT NULL CHECK (status IN ('healthy', 'unhealthy')),
                response_time_ms INTEGER NOT NULL CHECK (response_time_ms >= 0),
                recorded_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_heartbeats_recorded_at ON heartbeats(recorded_at)")
            .execute(&self.pool)
            .await?;

        info!("Heartbeat store initialized");
        Ok(())
    }

    async fn append(&self, status: HeartbeatStatus, response_time_ms: u64) -> Result<HeartbeatRecord> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let now_ms = self.clock.now().timestamp_millis();
        let stored_response_time = i64::try_from(response_time_ms).unwrap_or(i64::MAX);

        // The insert is the transaction's first statement so the write lock is
        // taken through the busy handler. Never stamp earlier than what is
        // already stored, even if the clock stepped back.
        let row = sqlx::query(
            r#"
            INSERT INTO heartbeats (status, response_time_ms, recorded_at)
            VALUES (?, ?, MAX(?, COALESCE((SELECT MAX(recorded_at) FROM heartbeats), ?)))
            RETURNING id, recorded_at
            "#,
        )
        .bind(status.as_str())
        .bind(stored_response_time)
        .bind(now_ms)
        .bind(now_ms)
        .fetch_one(&mut *tx)
        .await?;

        let id: i64 = row.try_get("id")?;
        let recorded_at: i64 = row.try_get("recorded_at")?;

        let cutoff = recorded_at.saturating_sub(self.retention_ms);
        let pruned = sqlx::query("DELETE FROM heartbeats WHERE recorded_at < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if pruned > 0 {
            debug!(pruned, "Pruned expired heartbeats");
        }

        Ok(HeartbeatRecord {
            id,
            timestamp: timestamp_from_millis(recorded_at)?,
            status,
            response_time_ms,
        })
    }

    async fn fetch_latest(&self) -> Result<Option<HeartbeatRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, status, response_time_ms, recorded_at
            FROM heartbeats
            ORDER BY recorded_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    async fn fetch_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM heartbeats")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl HeartbeatStore for SqliteHeartbeatStore {
    async fn initialize(&self) -> Result<()> {
        traced(
            self.recorder.as_ref(),
            "heartbeat.initialize",
            &[("db.system", "sqlite".to_string())],
            self.bounded(self.create_schema()),
        )
        .await
    }

    async fn insert(&self, status: HeartbeatStatus, response_time_ms: u64) -> Result<HeartbeatRecord> {
        let attributes = [
            ("db.system", "sqlite".to_string()),
            ("heartbeat.status", status.to_string()),
            ("heartbeat.response_time_ms", response_time_ms.to_string()),
        ];

        traced(
            self.recorder.as_ref(),
            "heartbeat.insert",
            &attributes,
            self.bounded(self.append(status, response_time_ms)),
        )
        .await
    }

    async fn latest(&self) -> Result<Option<HeartbeatRecord>> {
        traced(
            self.recorder.as_ref(),
            "heartbeat.latest",
            &[("db.system", "sqlite".to_string())],
            self.bounded(self.fetch_latest()),
        )
        .await
    }

    async fn count(&self) -> Result<i64> {
        self.bounded(self.fetch_count()).await
    }
}

fn timestamp_from_millis(ms: i64) -> Result<chrono::DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| AppError::StorageUnavailable(format!("stored timestamp out of range: {}", ms)))
}

fn record_from_row(row: &SqliteRow) -> Result<HeartbeatRecord> {
    let status: String = row.try_get("status")?;
    let response_time_ms: i64 = row.try_get("response_time_ms")?;
    let recorded_at: i64 = row.try_get("recorded_at")?;

    Ok(HeartbeatRecord {
        id: row.try_get("id")?,
        timestamp: timestamp_from_millis(recorded_at)?,
        status: status.parse().map_err(AppError::StorageUnavailable)?,
        response_time_ms: u64::try_from(response_time_ms).unwrap_or(0),
    })
}
