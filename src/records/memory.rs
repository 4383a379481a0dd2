//! In-memory record store for tests

use crate::records::traits::{JobRecord, RecordStore, StorageResult};

/// Record store that keeps everything in a `Vec`
///
/// Used by tests and scripted adapters; mirrors the duplicate semantics of
/// the SQLite backend.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Vec<JobRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, in insertion order
    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }
}

impl RecordStore for MemoryRecordStore {
    fn exists(&self, source: &str, id: &str) -> StorageResult<bool> {
        Ok(self
            .records
            .iter()
            .any(|r| r.source == source && r.id == id))
    }

    fn insert(&mut self, record: &JobRecord) -> StorageResult<Option<String>> {
        if self.exists(&record.source, &record.id)? {
            return Ok(None);
        }
        self.records.push(record.clone());
        Ok(Some(record.id.clone()))
    }

    fn merge_duplicates(&mut self) -> StorageResult<u64> {
        let mut seen = std::collections::HashSet::new();
        let before = self.records.len();
        self.records
            .retain(|r| seen.insert((r.source.clone(), r.id.clone())));
        Ok((before - self.records.len()) as u64)
    }

    fn count_records(&self) -> StorageResult<u64> {
        Ok(self.records.len() as u64)
    }

    fn count_by_source(&self, source: &str) -> StorageResult<u64> {
        Ok(self.records.iter().filter(|r| r.source == source).count() as u64)
    }
}
