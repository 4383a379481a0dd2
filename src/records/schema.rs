//! Database schema definitions
//!
//! This module contains the SQL schema for the Magpie record database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Collected job postings
CREATE TABLE IF NOT EXISTS jobs (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    source TEXT NOT NULL,
    keyword TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    collected_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_source_id ON jobs(source, job_id);
CREATE INDEX IF NOT EXISTS idx_jobs_keyword ON jobs(keyword);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
