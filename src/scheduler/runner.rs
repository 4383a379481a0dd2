//! Scheduler run loop
//!
//! Owns the state store and one executor per configured source. Each pass
//! computes decisions for every automatically scheduled source, runs the due
//! ones in configuration order, then sleeps until the next source could
//! become ready. Execution is single-threaded: one browser automation
//! session drives all sources sequentially.

use crate::config::SchedulerConfig;
use crate::executor::Executor;
use crate::scheduler::decision::{decide, ScheduleDecision, SKIPPED_WAIT};
use crate::state::StateStore;
use crate::{MagpieError, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drives all configured sources on their cadences
pub struct Scheduler {
    config: SchedulerConfig,
    store: StateStore,
    executors: Vec<Executor>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler over a state store and per-source executors
    ///
    /// Executor order is configuration order; due sources run in this order.
    pub fn new(config: SchedulerConfig, store: StateStore, executors: Vec<Executor>) -> Self {
        Self {
            config,
            store,
            executors,
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the cancellation token used for cooperative shutdown
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Computes decisions for all automatically scheduled sources
    ///
    /// Sources marked `ignore-automatic-schedule` never appear here; they
    /// only run through [`Scheduler::run_explicit`].
    pub fn decisions(&self, now: DateTime<Utc>, start_override: Option<&str>) -> Vec<ScheduleDecision> {
        self.executors
            .iter()
            .filter(|e| !e.config().ignore_automatic_schedule)
            .map(|e| {
                decide(
                    now,
                    e.config(),
                    &self.store.state(e.source_name()),
                    start_override,
                    self.config.error_wait_seconds,
                )
            })
            .collect()
    }

    /// Runs the scheduling loop until cancelled
    ///
    /// `start_at` applies to the first pass only: the named source runs
    /// immediately and every other source sits that pass out.
    pub async fn run_loop(&mut self, start_at: Option<String>) -> Result<()> {
        let mut start_override = start_at;

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Scheduler cancelled, stopping");
                return Ok(());
            }

            let now = Utc::now();
            self.anchor_first_run_waits(now)?;

            let decisions = self.decisions(now, start_override.as_deref());
            for decision in &decisions {
                tracing::debug!(
                    "Schedule: {} -> {:?} ({}s remaining)",
                    decision.source,
                    decision.status,
                    decision.seconds_remaining
                );
            }

            let due: Vec<String> = decisions
                .iter()
                .filter(|d| d.is_due())
                .map(|d| d.source.clone())
                .collect();

            for name in due {
                if self.cancel.is_cancelled() {
                    return Ok(());
                }
                self.run_source(&name).await?;
            }

            start_override = None;

            let wait = self.next_wait(Utc::now());
            tracing::debug!("Sleeping {:?} until next pass", wait);

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Scheduler cancelled, stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Runs the named sources unconditionally, in the given order
    ///
    /// Bypasses all scheduling rules; this is the manual one-off entry point
    /// and the only way `ignore-automatic-schedule` sources run.
    pub async fn run_explicit(&mut self, names: &[String]) -> Result<()> {
        // Validate up front so a typo fails before anything runs
        for name in names {
            if !self.executors.iter().any(|e| e.source_name() == name) {
                return Err(MagpieError::UnknownSource(name.clone()));
            }
        }

        for name in names {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            self.run_source(name).await?;
        }

        Ok(())
    }

    /// Runs one source, recording run-level failures in its state
    ///
    /// A failed run records the error and resets the last execution time, so
    /// the source is retried as soon as its error-wait window expires rather
    /// than waiting out a full cadence. Cancellation propagates.
    async fn run_source(&mut self, name: &str) -> Result<()> {
        let index = self
            .executors
            .iter()
            .position(|e| e.source_name() == name)
            .ok_or_else(|| MagpieError::UnknownSource(name.to_string()))?;

        tracing::info!("Running source '{}'", name);
        match self.executors[index].run(&mut self.store, false).await {
            Ok(()) => Ok(()),
            Err(MagpieError::Cancelled) => Err(MagpieError::Cancelled),
            Err(e) => {
                tracing::error!("Run failed for '{}': {}", name, e);
                self.store.set_error(name, Utc::now(), &e.to_string())?;
                self.store.reset_last_execution(name)?;
                Ok(())
            }
        }
    }

    /// Pins a first-run wait to the current pass
    ///
    /// `wait-before-first-run` counts a cadence down from somewhere; for a
    /// source that has never run, that somewhere is the first scheduling
    /// pass that sees it.
    fn anchor_first_run_waits(&mut self, now: DateTime<Utc>) -> Result<()> {
        let names: Vec<String> = self
            .executors
            .iter()
            .filter(|e| {
                e.config().wait_before_first_run
                    && !e.config().ignore_automatic_schedule
                    && self.store.state(e.source_name()).last_execution_time.is_none()
            })
            .map(|e| e.source_name().to_string())
            .collect();

        for name in names {
            tracing::info!("'{}' waits out one cadence before its first run", name);
            self.store.update_last_execution(&name, now)?;
        }

        Ok(())
    }

    /// How long to sleep before the next pass
    fn next_wait(&self, now: DateTime<Utc>) -> Duration {
        let min_remaining = self
            .decisions(now, None)
            .iter()
            .map(|d| d.seconds_remaining)
            .filter(|&s| s != SKIPPED_WAIT)
            .min()
            .unwrap_or(self.config.poll_interval_seconds);

        let capped = min_remaining
            .clamp(1, self.config.poll_interval_seconds)
            .unsigned_abs();
        Duration::from_secs(capped)
    }

    /// The state store, for status reporting
    pub fn store(&self) -> &StateStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::retry::{RetryPolicy, RetryTrace};
    use crate::source::{AdapterError, AdapterResult, Checkpoint, SourceAdapter};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Adapter that counts runs and optionally always fails preload
    struct CountingAdapter {
        name: String,
        runs: Arc<AtomicU32>,
        fail_preload: bool,
    }

    #[async_trait::async_trait]
    impl SourceAdapter for CountingAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn preload(&mut self) -> AdapterResult<()> {
            if self.fail_preload {
                Err(AdapterError::Login("no session".to_string()))
            } else {
                Ok(())
            }
        }

        async fn total_results(&mut self, _keyword: &str) -> AdapterResult<u64> {
            Ok(10)
        }

        async fn process_keyword(
            &mut self,
            keyword: &str,
            start_page: u32,
            checkpoint: &mut dyn Checkpoint,
        ) -> AdapterResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            checkpoint.page_done(keyword, start_page)?;
            Ok(())
        }

        fn job_id(&self, url: &str) -> AdapterResult<String> {
            crate::source::extract_job_id(url)
        }

        async fn close_session(&mut self) -> AdapterResult<()> {
            Ok(())
        }
    }

    fn source_config(name: &str, cadence: i64) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            cadence_seconds: cadence,
            close_session_after_run: false,
            ignore_automatic_schedule: false,
            wait_before_first_run: false,
            debug: false,
            keywords: None,
        }
    }

    fn scheduler_config() -> SchedulerConfig {
        SchedulerConfig {
            error_wait_seconds: 1800,
            poll_interval_seconds: 1,
        }
    }

    fn counting_executor(
        config: SourceConfig,
        runs: Arc<AtomicU32>,
        fail_preload: bool,
    ) -> Executor {
        let adapter = CountingAdapter {
            name: config.name.clone(),
            runs,
            fail_preload,
        };
        Executor::new(config, vec!["rust".to_string()], Box::new(adapter)).with_retry(
            RetryPolicy::new(1, Duration::from_millis(1)).with_trace(RetryTrace::Never),
        )
    }

    fn open_store(dir: &TempDir) -> StateStore {
        StateStore::open(&dir.path().join("state.toml")).unwrap()
    }

    #[tokio::test]
    async fn test_run_explicit_runs_named_sources() {
        let dir = TempDir::new().unwrap();
        let runs_a = Arc::new(AtomicU32::new(0));
        let runs_b = Arc::new(AtomicU32::new(0));

        let mut scheduler = Scheduler::new(
            scheduler_config(),
            open_store(&dir),
            vec![
                counting_executor(source_config("a", 3600), runs_a.clone(), false),
                counting_executor(source_config("b", 3600), runs_b.clone(), false),
            ],
        );

        scheduler.run_explicit(&["b".to_string()]).await.unwrap();

        assert_eq!(runs_a.load(Ordering::SeqCst), 0);
        assert_eq!(runs_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_explicit_unknown_source() {
        let dir = TempDir::new().unwrap();
        let runs = Arc::new(AtomicU32::new(0));

        let mut scheduler = Scheduler::new(
            scheduler_config(),
            open_store(&dir),
            vec![counting_executor(
                source_config("a", 3600),
                runs.clone(),
                false,
            )],
        );

        let result = scheduler
            .run_explicit(&["a".to_string(), "nope".to_string()])
            .await;

        assert!(matches!(result, Err(MagpieError::UnknownSource(_))));
        // Validation happens before anything runs
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_explicit_includes_ignored_sources() {
        let dir = TempDir::new().unwrap();
        let runs = Arc::new(AtomicU32::new(0));

        let mut config = source_config("manual", 3600);
        config.ignore_automatic_schedule = true;

        let mut scheduler = Scheduler::new(
            scheduler_config(),
            open_store(&dir),
            vec![counting_executor(config, runs.clone(), false)],
        );

        // Invisible to automatic decisions
        assert!(scheduler.decisions(Utc::now(), None).is_empty());

        scheduler.run_explicit(&["manual".to_string()]).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_run_records_error_and_resets_execution() {
        let dir = TempDir::new().unwrap();
        let runs = Arc::new(AtomicU32::new(0));

        let mut scheduler = Scheduler::new(
            scheduler_config(),
            open_store(&dir),
            vec![counting_executor(
                source_config("a", 3600),
                runs.clone(),
                true,
            )],
        );

        scheduler.run_explicit(&["a".to_string()]).await.unwrap();

        let state = scheduler.store().state("a");
        assert!(state.last_error_time.is_some());
        assert!(state.last_error_message.is_some());
        assert!(state.last_execution_time.is_none());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_loop_executes_ready_source_then_cancels() {
        let dir = TempDir::new().unwrap();
        let runs = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let mut scheduler = Scheduler::new(
            scheduler_config(),
            open_store(&dir),
            vec![counting_executor(
                source_config("a", 3600),
                runs.clone(),
                false,
            )],
        )
        .with_cancellation(cancel.clone());

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            canceller.cancel();
        });

        scheduler.run_loop(None).await.unwrap();

        // Never-run source was ready on the first pass; cadence keeps it from
        // running again before cancellation
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let state = scheduler.store().state("a");
        assert!(state.last_execution_time.is_some());
    }

    #[tokio::test]
    async fn test_run_loop_start_override_skips_others() {
        let dir = TempDir::new().unwrap();
        let runs_a = Arc::new(AtomicU32::new(0));
        let runs_b = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let mut scheduler = Scheduler::new(
            scheduler_config(),
            open_store(&dir),
            vec![
                counting_executor(source_config("a", 100_000), runs_a.clone(), false),
                counting_executor(source_config("b", 100_000), runs_b.clone(), false),
            ],
        )
        .with_cancellation(cancel.clone());

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            canceller.cancel();
        });

        scheduler.run_loop(Some("b".to_string())).await.unwrap();

        // First pass: only the starting target runs. "a" would have been
        // ready (never run) but sat the pass out, and its cadence is too long
        // for a second chance before cancellation... except "a" becomes ready
        // on the second pass. Only the first pass is constrained.
        assert_eq!(runs_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_before_first_run_is_anchored() {
        let dir = TempDir::new().unwrap();
        let runs = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();

        let mut config = source_config("a", 100_000);
        config.wait_before_first_run = true;

        let mut scheduler = Scheduler::new(
            scheduler_config(),
            open_store(&dir),
            vec![counting_executor(config, runs.clone(), false)],
        )
        .with_cancellation(cancel.clone());

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        scheduler.run_loop(None).await.unwrap();

        // Did not run, but the cadence countdown is now anchored
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(scheduler.store().state("a").last_execution_time.is_some());
    }
}
