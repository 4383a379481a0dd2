//! Record store module
//!
//! Collected job postings land here. The scheduler core only depends on the
//! [`RecordStore`] trait; the SQLite implementation is the production backend
//! and the in-memory one backs tests.

mod memory;
pub mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;
pub use traits::{JobRecord, RecordStore, StorageError, StorageResult};
