//! Source adapter interfaces
//!
//! A source is one independently schedulable job board. All site-specific
//! behavior (login, selectors, pagination clicks) lives behind the
//! [`SourceAdapter`] trait; the core only ever holds the trait object. The
//! [`Checkpoint`] trait is how an adapter reports page-level progress back
//! into the state store without depending on it directly.

use crate::retry::RetryClass;
use thiserror::Error;

/// Errors produced by source adapters, classified for the retry layer
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A transient failure another attempt could fix (timeout, stale element)
    #[error("Transient failure: {0}")]
    Transient(String),

    /// A failure retrying will not fix (layout change, bad keyword encoding)
    #[error("Fatal failure: {0}")]
    Fatal(String),

    /// Login or session preload failed; fatal for the whole scheduling pass
    #[error("Login failure: {0}")]
    Login(String),

    /// Cooperative cancellation; propagates through every layer untouched
    #[error("Cancelled")]
    Cancelled,

    /// A checkpoint write failed underneath the adapter
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] crate::state::StateError),
}

impl RetryClass for AdapterError {
    fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Transient(_))
    }

    fn is_cancelled(&self) -> bool {
        matches!(self, AdapterError::Cancelled)
    }
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Page-level progress sink handed to [`SourceAdapter::process_keyword`]
///
/// The adapter calls [`Checkpoint::page_done`] after each fully processed
/// page. The executor's implementation writes the resume cursor through the
/// state store, so a crash restarts at the last completed page.
pub trait Checkpoint: Send {
    /// Marks a page of a keyword as completely processed
    fn page_done(&mut self, keyword: &str, page: u32) -> AdapterResult<()>;
}

/// Capability set of one job board
///
/// One implementation per board. Adapters own their browser tab: it is
/// created lazily on `preload`, reused across scheduling passes, and released
/// by `close_session` when the source is configured as non-persistent.
#[async_trait::async_trait]
pub trait SourceAdapter: Send {
    /// The source name this adapter serves
    fn name(&self) -> &str;

    /// One-time-per-session login/setup, distinct from keyword processing
    async fn preload(&mut self) -> AdapterResult<()>;

    /// Total result count the board reports for a keyword
    async fn total_results(&mut self, keyword: &str) -> AdapterResult<u64>;

    /// Processes one keyword from `start_page` to the end
    ///
    /// Paginates internally, writing each item to the record store and
    /// calling `checkpoint.page_done` after each page.
    async fn process_keyword(
        &mut self,
        keyword: &str,
        start_page: u32,
        checkpoint: &mut dyn Checkpoint,
    ) -> AdapterResult<()>;

    /// Extracts the board-specific job identifier from a posting URL
    fn job_id(&self, url: &str) -> AdapterResult<String>;

    /// Releases the adapter's browser tab/session
    async fn close_session(&mut self) -> AdapterResult<()>;
}

/// Extracts a job identifier from a posting URL
///
/// Default strategy shared by adapters: prefer an `id`-like query parameter,
/// fall back to the last non-empty path segment.
pub fn extract_job_id(url: &str) -> AdapterResult<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| AdapterError::Fatal(format!("Unparseable posting URL '{}': {}", url, e)))?;

    for (key, value) in parsed.query_pairs() {
        if matches!(key.as_ref(), "id" | "jobId" | "jk" | "posting") && !value.is_empty() {
            return Ok(value.into_owned());
        }
    }

    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_string())
        .ok_or_else(|| AdapterError::Fatal(format!("No job id in URL '{}'", url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_query_parameter() {
        let id = extract_job_id("https://jobs.example.com/view?jk=abc123&from=serp").unwrap();
        assert_eq!(id, "abc123");
    }

    #[test]
    fn test_extract_from_path_segment() {
        let id = extract_job_id("https://jobs.example.com/postings/9912734/").unwrap();
        assert_eq!(id, "9912734");
    }

    #[test]
    fn test_query_parameter_wins_over_path() {
        let id = extract_job_id("https://jobs.example.com/postings/999?id=abc").unwrap();
        assert_eq!(id, "abc");
    }

    #[test]
    fn test_invalid_url() {
        assert!(extract_job_id("not a url").is_err());
    }

    #[test]
    fn test_no_id_available() {
        assert!(extract_job_id("https://jobs.example.com").is_err());
    }

    #[test]
    fn test_error_classification() {
        assert!(AdapterError::Transient("x".into()).is_retryable());
        assert!(!AdapterError::Fatal("x".into()).is_retryable());
        assert!(!AdapterError::Login("x".into()).is_retryable());
        assert!(AdapterError::Cancelled.is_cancelled());
        assert!(!AdapterError::Cancelled.is_retryable());
    }
}
