//! Per-source run executor
//!
//! The executor drives one source through a complete run: preload the
//! session if needed, walk the keyword list honoring the resume cursor, and
//! isolate per-keyword failures so one bad search term never aborts the rest
//! of the run. All adapter calls go through the shared [`RetryPolicy`].

use crate::config::{keyword_fingerprint, SourceConfig};
use crate::retry::{RetryClass, RetryPolicy};
use crate::source::{AdapterError, AdapterResult, Checkpoint, SourceAdapter};
use crate::state::{ResumeCursor, StateStore};
use crate::{MagpieError, Result};
use chrono::Utc;
use std::time::Duration;

/// Checkpoint implementation that writes the resume cursor through the store
///
/// `page_done` records the page that just completed; after a crash the same
/// page is re-processed and its already-inserted items surface as duplicates
/// in the record store.
struct StoreCheckpoint<'a> {
    source: &'a str,
    store: &'a mut StateStore,
}

impl Checkpoint for StoreCheckpoint<'_> {
    fn page_done(&mut self, keyword: &str, page: u32) -> AdapterResult<()> {
        self.store.update_resume(self.source, keyword, page)?;
        Ok(())
    }
}

/// Executor for one source
///
/// Long-lived: one instance per configured source, holding the adapter (and
/// with it the adapter's browser tab) across scheduling passes.
pub struct Executor {
    config: SourceConfig,
    keywords: Vec<String>,
    adapter: Box<dyn SourceAdapter>,
    retry: RetryPolicy,
    preloaded: bool,
}

impl Executor {
    /// Creates an executor for a source with its effective keyword list
    pub fn new(config: SourceConfig, keywords: Vec<String>, adapter: Box<dyn SourceAdapter>) -> Self {
        Self {
            config,
            keywords,
            adapter,
            retry: RetryPolicy::new(2, Duration::from_secs(5)),
            preloaded: false,
        }
    }

    /// Replaces the retry policy used for adapter calls
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The name of the source this executor drives
    pub fn source_name(&self) -> &str {
        &self.config.name
    }

    /// The source configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Runs this source
    ///
    /// With `preload_only` the adapter's login/preload hook runs and nothing
    /// else; a preload failure propagates unmodified so the scheduler can see
    /// it. A full run walks the keyword list with per-keyword failure
    /// isolation and finalizes the source state afterwards.
    pub async fn run(&mut self, store: &mut StateStore, preload_only: bool) -> Result<()> {
        if !self.preloaded {
            tracing::info!("Preloading session for '{}'", self.config.name);
            let adapter = &mut self.adapter;
            self.retry
                .run(async || adapter.preload().await)
                .await
                .map_err(|e| Self::lift(&self.config.name, e))?;
            self.preloaded = true;
        }

        if preload_only {
            return Ok(());
        }

        let run_start = Utc::now();
        let source = self.config.name.clone();

        store.note_keywords(&source, &keyword_fingerprint(&self.keywords))?;
        let mut cursor = ResumeCursor::new(&store.state(&source));

        let keywords = self.keywords.clone();
        for keyword in &keywords {
            let decision = cursor.should_skip(keyword);
            if decision.skip {
                tracing::info!(
                    "'{}': skipping '{}' (completed before interruption)",
                    source,
                    keyword
                );
                continue;
            }

            match self
                .process_one_keyword(store, &source, keyword, decision.start_page)
                .await
            {
                Ok(()) => {
                    store.remove_failed_keyword(&source, keyword)?;
                }
                Err(e) if e.is_cancelled() => {
                    // Cancellation is not a keyword failure; the last
                    // checkpoint stays as the restart point
                    return Err(MagpieError::Cancelled);
                }
                Err(e) => {
                    tracing::error!("'{}': keyword '{}' failed: {}", source, keyword, e);
                    store.add_failed_keyword(&source, keyword)?;
                }
            }
        }

        store.finalize(&source)?;
        store.update_last_execution(&source, run_start)?;

        if self.config.close_session_after_run {
            self.close_session().await?;
        }

        let remaining = store.state(&source).failed_keywords.len();
        if remaining > 0 {
            tracing::warn!(
                "'{}': run finished with {} failed keyword(s), retried next run",
                source,
                remaining
            );
        } else {
            tracing::info!("'{}': run finished clean", source);
        }

        Ok(())
    }

    /// Processes a single keyword through the adapter, with retries
    async fn process_one_keyword(
        &mut self,
        store: &mut StateStore,
        source: &str,
        keyword: &str,
        start_page: u32,
    ) -> std::result::Result<(), AdapterError> {
        let adapter = &mut self.adapter;

        // Result-count probe is informational only; a probe failure must not
        // fail the keyword
        if let Some(total) = self
            .retry
            .run_swallow(async || adapter.total_results(keyword).await)
            .await?
        {
            if self.config.debug {
                tracing::info!("'{}': '{}' reports {} results", source, keyword, total);
            } else {
                tracing::debug!("'{}': '{}' reports {} results", source, keyword, total);
            }
        }

        let mut checkpoint = StoreCheckpoint { source, store };
        self.retry
            .run(async || {
                adapter
                    .process_keyword(keyword, start_page, &mut checkpoint)
                    .await
            })
            .await
    }

    /// Releases the adapter session; failures are logged, not fatal
    pub async fn close_session(&mut self) -> Result<()> {
        let adapter = &mut self.adapter;
        self.retry
            .run_swallow(async || adapter.close_session().await)
            .await
            .map_err(|e| Self::lift(&self.config.name, e))?;
        self.preloaded = false;
        Ok(())
    }

    fn lift(source_name: &str, e: AdapterError) -> MagpieError {
        if matches!(e, AdapterError::Cancelled) {
            MagpieError::Cancelled
        } else {
            MagpieError::Adapter {
                source_name: source_name.to_string(),
                source: e,
            }
        }
    }
}
