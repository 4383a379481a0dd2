//! Record store trait and error types

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during record store operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for record store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One collected job posting
///
/// The id is the board-specific identifier extracted from the posting URL;
/// everything else is minimal metadata. Record shape beyond the id is
/// deliberately thin; enrichment happens elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    /// Board-specific job identifier (unique per source)
    pub id: String,

    /// Source name that collected this record
    pub source: String,

    /// Search keyword that surfaced this posting
    pub keyword: String,

    /// Posting URL
    pub url: String,

    /// Posting title as shown in the result list
    pub title: String,

    /// When this record was collected
    pub collected_at: DateTime<Utc>,
}

/// Trait for record store backends
///
/// Duplicate detection through `exists`/`insert` is what makes page-level
/// resumption safe: a re-processed page re-offers records that were already
/// written, and the store must absorb them.
pub trait RecordStore {
    /// Whether a record with this id exists for the given source
    fn exists(&self, source: &str, id: &str) -> StorageResult<bool>;

    /// Inserts a record, returning its id, or `None` when it was a duplicate
    fn insert(&mut self, record: &JobRecord) -> StorageResult<Option<String>>;

    /// Collapses duplicate records (same source and id), keeping the oldest
    ///
    /// Returns the number of records removed.
    fn merge_duplicates(&mut self) -> StorageResult<u64>;

    /// Total number of records
    fn count_records(&self) -> StorageResult<u64>;

    /// Number of records for one source
    fn count_by_source(&self, source: &str) -> StorageResult<u64>;
}
