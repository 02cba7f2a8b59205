//! SQLite target store implementation
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Better concurrency for reads during writes
//! - **Connection pooling**: Efficient resource usage
//! - **Migrations**: Automatic schema versioning with sqlx

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, TargetStore};
use super::error::{StorageError, StorageResult};
use super::schema::TargetRow;
use crate::target::{Target, TargetId};

/// SQLite target store
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) the database and run migrations
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use uptime_monitoring::storage::sqlite::SqliteStore;
    /// # async fn example() -> anyhow::Result<()> {
    /// let store = SqliteStore::new("./targets.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl TargetStore for SqliteStore {
    #[instrument(skip(self))]
    async fn list_targets(&self) -> StorageResult<Vec<Target>> {
        let rows = sqlx::query(
            r#"
            SELECT id, position, name, address, kind, paused, status, updated_at, document
            FROM targets
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let targets: Result<Vec<Target>, StorageError> = rows
            .into_iter()
            .map(|row| {
                TargetRow {
                    id: row.get("id"),
                    position: row.get("position"),
                    name: row.get("name"),
                    address: row.get("address"),
                    kind: row.get("kind"),
                    paused: row.get("paused"),
                    status: row.get("status"),
                    updated_at: Self::millis_to_timestamp(row.get("updated_at")),
                    document: row.get("document"),
                }
                .into_target()
            })
            .collect();

        let targets = targets?;
        debug!("loaded {} targets", targets.len());
        Ok(targets)
    }

    #[instrument(skip(self, target), fields(target = %target.id))]
    async fn upsert_target(&self, target: &Target) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let existing: Option<(i64,)> = sqlx::query_as("SELECT position FROM targets WHERE id = ?")
            .bind(target.id.to_string())
            .fetch_optional(&mut *tx)
            .await?;

        let position = match existing {
            Some((position,)) => position,
            None => {
                let (next,): (i64,) =
                    sqlx::query_as("SELECT COALESCE(MAX(position) + 1, 0) FROM targets")
                        .fetch_one(&mut *tx)
                        .await?;
                next
            }
        };

        let row = TargetRow::from_target(target, position)?;

        sqlx::query(
            r#"
            INSERT INTO targets (id, position, name, address, kind, paused, status, updated_at, document)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                kind = excluded.kind,
                paused = excluded.paused,
                status = excluded.status,
                updated_at = excluded.updated_at,
                document = excluded.document
            "#,
        )
        .bind(&row.id)
        .bind(row.position)
        .bind(&row.name)
        .bind(&row.address)
        .bind(&row.kind)
        .bind(row.paused)
        .bind(&row.status)
        .bind(row.updated_at.timestamp_millis())
        .bind(&row.document)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_target(&self, id: TargetId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM targets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn reorder(&self, ids: &[TargetId]) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        // Unlisted targets keep their relative order after the listed ones
        let offset = ids.len() as i64;
        sqlx::query("UPDATE targets SET position = position + ? + 1000000")
            .bind(offset)
            .execute(&mut *tx)
            .await?;

        for (position, id) in ids.iter().enumerate() {
            sqlx::query("UPDATE targets SET position = ? WHERE id = ?")
                .bind(position as i64)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM targets")
            .fetch_one(&self.pool)
            .await?;

        let (paused,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM targets WHERE paused = 1")
            .fetch_one(&self.pool)
            .await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(format!(
            "SQLite: {} targets ({} paused), {:.2} MB on disk",
            total,
            paused,
            file_size as f64 / 1_000_000.0
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite store");
        self.pool.close().await;
        Ok(())
    }
}
