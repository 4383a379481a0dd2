use crate::state::SourceState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during state store operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to parse state file: {0}")]
    Deserialize(#[from] toml::de::Error),
}

/// Result type for state store operations
pub type StateResult<T> = Result<T, StateError>;

/// On-disk shape of the state file: one table per source name
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    sources: BTreeMap<String, SourceState>,
}

/// Durable, file-backed store of per-source runtime state
///
/// Every mutation rewrites the whole file (write to a temp file, then rename
/// over the old one) before the mutating call returns. Resumption checkpoints
/// are therefore on disk before the page they cover counts as done; a crash at
/// any point restarts from the last completed page. There is no buffering and
/// no partial patching.
pub struct StateStore {
    path: PathBuf,
    file: StateFile,
}

impl StateStore {
    /// Opens a state store, loading the file if it exists
    ///
    /// A missing file is an empty store; records are created lazily on first
    /// write.
    pub fn open(path: &Path) -> StateResult<Self> {
        let file = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            StateFile::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Returns the state for a source, zero-valued if absent
    pub fn state(&self, source: &str) -> SourceState {
        self.file.sources.get(source).cloned().unwrap_or_default()
    }

    /// Sets the resume cursor after a page of a keyword completes
    ///
    /// This is the crash-recovery checkpoint: resumption is page-level, not
    /// item-level. Items already written from a re-processed page must be
    /// caught as duplicates by the record store.
    pub fn update_resume(&mut self, source: &str, keyword: &str, page: u32) -> StateResult<()> {
        let state = self.entry(source);
        state.resume_keyword = Some(keyword.to_string());
        state.resume_page = page.max(1);
        self.flush()
    }

    /// Drops the resume cursor only
    pub fn clear_resume(&mut self, source: &str) -> StateResult<()> {
        self.entry(source).clear_resume();
        self.flush()
    }

    /// Records a keyword that failed during a run
    pub fn add_failed_keyword(&mut self, source: &str, keyword: &str) -> StateResult<()> {
        self.entry(source).failed_keywords.insert(keyword.to_string());
        self.flush()
    }

    /// Removes a keyword from the failed set after it succeeds
    pub fn remove_failed_keyword(&mut self, source: &str, keyword: &str) -> StateResult<()> {
        self.entry(source).failed_keywords.remove(keyword);
        self.flush()
    }

    /// Records a run-level error
    pub fn set_error(&mut self, source: &str, now: DateTime<Utc>, message: &str) -> StateResult<()> {
        let state = self.entry(source);
        state.last_error_time = Some(now);
        state.last_error_message = Some(message.to_string());
        self.flush()
    }

    /// Finalizes a run: clears the error fields, and clears the resume cursor
    /// only when no failed keywords remain
    ///
    /// With outstanding failures the resume and failure state stays intact so
    /// the next scheduled run picks up exactly where this one left off.
    /// Idempotent: finalizing twice without intervening writes is a no-op the
    /// second time.
    pub fn finalize(&mut self, source: &str) -> StateResult<()> {
        let state = self.entry(source);
        state.clear_error();
        if state.failed_keywords.is_empty() {
            state.clear_resume();
        }
        self.flush()
    }

    /// Sets the last execution time (the run's start time)
    pub fn update_last_execution(
        &mut self,
        source: &str,
        timestamp: DateTime<Utc>,
    ) -> StateResult<()> {
        self.entry(source).last_execution_time = Some(timestamp);
        self.flush()
    }

    /// Resets the last execution time to "never"
    ///
    /// Used after a failed run so the source is retried as soon as its
    /// error-wait window expires rather than waiting out a full cadence.
    pub fn reset_last_execution(&mut self, source: &str) -> StateResult<()> {
        self.entry(source).last_execution_time = None;
        self.flush()
    }

    /// Reconciles the stored resume cursor with the current keyword list
    ///
    /// Resumption is positional, so a cursor written against a different
    /// keyword list is meaningless. When the stored fingerprint differs the
    /// cursor is dropped with a warning; failed keywords are kept.
    pub fn note_keywords(&mut self, source: &str, fingerprint: &str) -> StateResult<()> {
        let state = self.entry(source);
        let stale = state.has_resume()
            && state
                .keywords_fingerprint
                .as_deref()
                .map(|stored| stored != fingerprint)
                .unwrap_or(true);

        if stale {
            tracing::warn!(
                "Keyword list for '{}' changed since the interrupted run; dropping stale resume cursor",
                source
            );
            state.clear_resume();
        }

        state.keywords_fingerprint = Some(fingerprint.to_string());
        self.flush()
    }

    fn entry(&mut self, source: &str) -> &mut SourceState {
        self.file
            .sources
            .entry(source.to_string())
            .or_default()
    }

    /// Rewrites the state file in full
    fn flush(&self) -> StateResult<()> {
        let content = toml::to_string_pretty(&self.file)?;

        // Temp file + rename keeps a crash mid-write from truncating the file
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
