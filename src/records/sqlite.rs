//! SQLite record store implementation

use crate::records::schema::initialize_schema;
use crate::records::traits::{JobRecord, RecordStore, StorageResult};
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite-backed record store
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Opens (or creates) the record database at the given path
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteRecordStore {
    fn exists(&self, source: &str, id: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE source = ?1 AND job_id = ?2",
            params![source, id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert(&mut self, record: &JobRecord) -> StorageResult<Option<String>> {
        if self.exists(&record.source, &record.id)? {
            return Ok(None);
        }

        self.conn.execute(
            "INSERT INTO jobs (job_id, source, keyword, url, title, collected_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.source,
                record.keyword,
                record.url,
                record.title,
                record.collected_at.to_rfc3339(),
            ],
        )?;

        Ok(Some(record.id.clone()))
    }

    fn merge_duplicates(&mut self) -> StorageResult<u64> {
        // Keep the oldest row of each (source, job_id) pair
        let removed = self.conn.execute(
            "DELETE FROM jobs WHERE row_id NOT IN
             (SELECT MIN(row_id) FROM jobs GROUP BY source, job_id)",
            [],
        )?;
        Ok(removed as u64)
    }

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_source(&self, source: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE source = ?1",
            params![source],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(source: &str, id: &str) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            source: source.to_string(),
            keyword: "rust developer".to_string(),
            url: format!("https://{}.example.com/view?id={}", source, id),
            title: "Rust Developer".to_string(),
            collected_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_exists() {
        let mut store = SqliteRecordStore::new_in_memory().unwrap();

        assert!(!store.exists("ironboard", "j1").unwrap());

        let id = store.insert(&record("ironboard", "j1")).unwrap();
        assert_eq!(id.as_deref(), Some("j1"));
        assert!(store.exists("ironboard", "j1").unwrap());
    }

    #[test]
    fn test_duplicate_insert_returns_none() {
        let mut store = SqliteRecordStore::new_in_memory().unwrap();

        store.insert(&record("ironboard", "j1")).unwrap();
        let second = store.insert(&record("ironboard", "j1")).unwrap();

        assert!(second.is_none());
        assert_eq!(store.count_records().unwrap(), 1);
    }

    #[test]
    fn test_same_id_different_source_is_not_duplicate() {
        let mut store = SqliteRecordStore::new_in_memory().unwrap();

        store.insert(&record("ironboard", "j1")).unwrap();
        let other = store.insert(&record("lanternjobs", "j1")).unwrap();

        assert!(other.is_some());
        assert_eq!(store.count_records().unwrap(), 2);
        assert_eq!(store.count_by_source("ironboard").unwrap(), 1);
    }

    #[test]
    fn test_merge_duplicates() {
        let mut store = SqliteRecordStore::new_in_memory().unwrap();

        // Force duplicates in below the trait API
        for _ in 0..3 {
            let r = record("ironboard", "j1");
            store
                .conn
                .execute(
                    "INSERT INTO jobs (job_id, source, keyword, url, title, collected_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![r.id, r.source, r.keyword, r.url, r.title, r.collected_at.to_rfc3339()],
                )
                .unwrap();
        }

        let removed = store.merge_duplicates().unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count_records().unwrap(), 1);
    }
}
