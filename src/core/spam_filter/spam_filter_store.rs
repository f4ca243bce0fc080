use super::spam_filter_models::{EntryFilter, FilterEntry, InsertOptions, InsertReport};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Backend(String),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Persistence for username spam filter configuration.
///
/// Rows are addressed by `(server_id, object_type, object_id)`.
#[async_trait]
pub trait FilterConfigStore: Send + Sync {
    /// All rows matching `filter`.
    async fn find_many(&self, filter: &EntryFilter) -> Result<Vec<FilterEntry>, StoreError>;

    /// Insert every row independently. A failing row never stops the rest.
    ///
    /// With `tolerate_duplicate_key`, rows that already exist are reported in
    /// `InsertReport::duplicates`; otherwise they land in `failed`.
    /// Only an unreachable backend is returned as `Err`.
    async fn insert_many(
        &self,
        rows: Vec<FilterEntry>,
        options: InsertOptions,
    ) -> Result<InsertReport, StoreError>;

    /// Delete the first row matching `filter`. Returns whether a row was removed.
    async fn delete_one(&self, filter: &EntryFilter) -> Result<bool, StoreError>;
}
