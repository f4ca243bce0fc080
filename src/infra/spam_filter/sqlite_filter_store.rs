// SQLite-backed store for username spam filter configuration.
//
// Tables:
// - username_spam_filter: protected roles and allowlist rows, one per
//   (guild_id, object_type, object_id)

use crate::core::spam_filter::{
    EntryFilter, FilterConfigStore, FilterEntry, FilterObjectType, InsertOptions, InsertReport,
    StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use std::path::Path;

pub struct SqliteFilterStore {
    pool: Pool<Sqlite>,
}

impl SqliteFilterStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file at `path` and run migrations.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(e.to_string()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", path))
            .await
            .map_err(backend)?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS username_spam_filter (
                guild_id INTEGER NOT NULL,
                guild_name TEXT NOT NULL,
                object_type TEXT NOT NULL,
                object_id INTEGER NOT NULL,
                object_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, object_type, object_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn insert_one(&self, row: &FilterEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO username_spam_filter
                (guild_id, guild_name, object_type, object_id, object_name, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.server_id as i64)
        .bind(&row.server_name)
        .bind(row.object_type.as_str())
        .bind(row.object_id as i64)
        .bind(&row.object_name)
        .bind(row.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Append `WHERE` clauses for every set field of `filter`.
fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &EntryFilter) {
    query.push(" WHERE 1 = 1");
    if let Some(id) = filter.server_id {
        query.push(" AND guild_id = ").push_bind(id as i64);
    }
    if let Some(object_type) = filter.object_type {
        query.push(" AND object_type = ").push_bind(object_type.as_str());
    }
    if let Some(id) = filter.object_id {
        query.push(" AND object_id = ").push_bind(id as i64);
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<FilterEntry, StoreError> {
    let object_type: String = row.get("object_type");
    let object_type = FilterObjectType::parse(&object_type)
        .ok_or_else(|| StoreError::CorruptRow(format!("unknown object type {object_type}")))?;

    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(FilterEntry {
        server_id: row.get::<i64, _>("guild_id") as u64,
        server_name: row.get("guild_name"),
        object_type,
        object_id: row.get::<i64, _>("object_id") as u64,
        object_name: row.get("object_name"),
        created_at,
    })
}

#[async_trait]
impl FilterConfigStore for SqliteFilterStore {
    async fn find_many(&self, filter: &EntryFilter) -> Result<Vec<FilterEntry>, StoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT guild_id, guild_name, object_type, object_id, object_name, created_at \
             FROM username_spam_filter",
        );
        push_filter(&mut query, filter);
        query.push(" ORDER BY created_at ASC");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            match entry_from_row(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping username spam filter row: {}", e),
            }
        }
        Ok(entries)
    }

    async fn insert_many(
        &self,
        rows: Vec<FilterEntry>,
        options: InsertOptions,
    ) -> Result<InsertReport, StoreError> {
        let mut report = InsertReport::default();

        for row in rows {
            match self.insert_one(&row).await {
                Ok(()) => report.inserted += 1,
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    if options.tolerate_duplicate_key {
                        report.duplicates.push(row);
                    } else {
                        let reason = StoreError::DuplicateKey(format!(
                            "{} {} in guild {}",
                            row.object_type, row.object_id, row.server_id
                        ));
                        report.failed.push((row, reason.to_string()));
                    }
                }
                // Connection-level failures mean no later row will succeed either
                Err(e @ (sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))) => {
                    return Err(backend(e));
                }
                Err(e) => report.failed.push((row, e.to_string())),
            }
        }

        Ok(report)
    }

    async fn delete_one(&self, filter: &EntryFilter) -> Result<bool, StoreError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "DELETE FROM username_spam_filter \
             WHERE rowid IN (SELECT rowid FROM username_spam_filter",
        );
        push_filter(&mut query, filter);
        query.push(" LIMIT 1)");

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }
}
