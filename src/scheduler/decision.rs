//! Per-source scheduling decision
//!
//! [`decide`] is a pure function of the clock, the source config, and the
//! persisted state. Keeping it free of IO is what makes the scheduling rules
//! testable without a running loop.

use crate::config::SourceConfig;
use crate::state::SourceState;
use chrono::{DateTime, Utc};

/// Sentinel wait for sources that do not run at all this pass
pub const SKIPPED_WAIT: i64 = i64::MAX;

/// Why a source is or is not running this pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStatus {
    /// Cadence elapsed; runs this pass
    Ready,
    /// Waiting out its cadence
    Pending,
    /// Waiting out the error cooldown window
    ErrorWait,
    /// Named by the starting-at override; runs now regardless of cadence
    StartingTarget,
    /// Another source is the starting target; sits this pass out entirely
    SkippedForStart,
}

/// Which window the remaining wait is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    Default,
    ErrorWait,
}

/// Scheduling decision for one source in one pass
#[derive(Debug, Clone)]
pub struct ScheduleDecision {
    pub source: String,
    pub seconds_remaining: i64,
    pub status: DecisionStatus,
    pub wait_kind: WaitKind,
}

impl ScheduleDecision {
    /// Whether this source executes this pass
    pub fn is_due(&self) -> bool {
        matches!(
            self.status,
            DecisionStatus::Ready | DecisionStatus::StartingTarget
        )
    }
}

/// Computes the scheduling decision for one source
///
/// Priority order:
/// 1. A starting-at override for another source skips this one outright.
/// 2. A starting-at override for this source forces an immediate run.
/// 3. A recent error keeps the source in its error-wait window, regardless
///    of cadence.
/// 4. Otherwise the cadence counts down from the last execution time. A
///    source that has never run is ready immediately unless it is configured
///    to wait out one full cadence first.
pub fn decide(
    now: DateTime<Utc>,
    config: &SourceConfig,
    state: &SourceState,
    start_override: Option<&str>,
    error_wait_seconds: i64,
) -> ScheduleDecision {
    if let Some(target) = start_override {
        if target != config.name {
            return ScheduleDecision {
                source: config.name.clone(),
                seconds_remaining: SKIPPED_WAIT,
                status: DecisionStatus::SkippedForStart,
                wait_kind: WaitKind::Default,
            };
        }
        return ScheduleDecision {
            source: config.name.clone(),
            seconds_remaining: 0,
            status: DecisionStatus::StartingTarget,
            wait_kind: WaitKind::Default,
        };
    }

    if let Some(error_time) = state.last_error_time {
        let elapsed = (now - error_time).num_seconds();
        if elapsed < error_wait_seconds {
            return ScheduleDecision {
                source: config.name.clone(),
                seconds_remaining: error_wait_seconds - elapsed,
                status: DecisionStatus::ErrorWait,
                wait_kind: WaitKind::ErrorWait,
            };
        }
    }

    let seconds_remaining = match state.last_execution_time {
        None => {
            if config.wait_before_first_run {
                config.cadence_seconds
            } else {
                0
            }
        }
        Some(last) => (config.cadence_seconds - (now - last).num_seconds()).max(0),
    };

    ScheduleDecision {
        source: config.name.clone(),
        seconds_remaining,
        status: if seconds_remaining == 0 {
            DecisionStatus::Ready
        } else {
            DecisionStatus::Pending
        },
        wait_kind: WaitKind::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ERROR_WAIT: i64 = 1800;

    fn test_config(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            cadence_seconds: 3600,
            close_session_after_run: false,
            ignore_automatic_schedule: false,
            wait_before_first_run: false,
            debug: false,
            keywords: None,
        }
    }

    #[test]
    fn test_never_run_is_ready_immediately() {
        let decision = decide(
            Utc::now(),
            &test_config("ironboard"),
            &SourceState::default(),
            None,
            ERROR_WAIT,
        );

        assert_eq!(decision.status, DecisionStatus::Ready);
        assert_eq!(decision.seconds_remaining, 0);
        assert!(decision.is_due());
    }

    #[test]
    fn test_never_run_with_first_run_wait() {
        let mut config = test_config("ironboard");
        config.wait_before_first_run = true;

        let decision = decide(
            Utc::now(),
            &config,
            &SourceState::default(),
            None,
            ERROR_WAIT,
        );

        assert_eq!(decision.status, DecisionStatus::Pending);
        assert_eq!(decision.seconds_remaining, 3600);
    }

    #[test]
    fn test_cadence_exactly_elapsed_is_ready() {
        let now = Utc::now();
        let state = SourceState {
            last_execution_time: Some(now - Duration::seconds(3600)),
            ..Default::default()
        };

        let decision = decide(now, &test_config("ironboard"), &state, None, ERROR_WAIT);

        assert_eq!(decision.status, DecisionStatus::Ready);
        assert_eq!(decision.seconds_remaining, 0);
    }

    #[test]
    fn test_cadence_not_elapsed_is_pending() {
        let now = Utc::now();
        let state = SourceState {
            last_execution_time: Some(now - Duration::seconds(3000)),
            ..Default::default()
        };

        let decision = decide(now, &test_config("ironboard"), &state, None, ERROR_WAIT);

        assert_eq!(decision.status, DecisionStatus::Pending);
        assert_eq!(decision.seconds_remaining, 600);
        assert_eq!(decision.wait_kind, WaitKind::Default);
        assert!(!decision.is_due());
    }

    #[test]
    fn test_error_wait_dominates_cadence() {
        let now = Utc::now();
        // Cadence long elapsed, but an error 600s ago holds the source back
        let state = SourceState {
            last_execution_time: Some(now - Duration::seconds(10_000)),
            last_error_time: Some(now - Duration::seconds(600)),
            ..Default::default()
        };

        let decision = decide(now, &test_config("ironboard"), &state, None, ERROR_WAIT);

        assert_eq!(decision.status, DecisionStatus::ErrorWait);
        assert_eq!(decision.seconds_remaining, 1200);
        assert_eq!(decision.wait_kind, WaitKind::ErrorWait);
    }

    #[test]
    fn test_error_wait_expired_falls_through_to_cadence() {
        let now = Utc::now();
        let state = SourceState {
            last_error_time: Some(now - Duration::seconds(ERROR_WAIT + 1)),
            ..Default::default()
        };

        let decision = decide(now, &test_config("ironboard"), &state, None, ERROR_WAIT);

        // No last execution: ready as soon as the error window expires
        assert_eq!(decision.status, DecisionStatus::Ready);
    }

    #[test]
    fn test_start_override_target() {
        let now = Utc::now();
        // Cadence has NOT elapsed, but the override forces the run
        let state = SourceState {
            last_execution_time: Some(now),
            ..Default::default()
        };

        let decision = decide(
            now,
            &test_config("ironboard"),
            &state,
            Some("ironboard"),
            ERROR_WAIT,
        );

        assert_eq!(decision.status, DecisionStatus::StartingTarget);
        assert_eq!(decision.seconds_remaining, 0);
        assert!(decision.is_due());
    }

    #[test]
    fn test_start_override_skips_others() {
        let now = Utc::now();
        // This source is overdue, but another source is the starting target
        let state = SourceState {
            last_execution_time: Some(now - Duration::seconds(100_000)),
            ..Default::default()
        };

        let decision = decide(
            now,
            &test_config("ironboard"),
            &state,
            Some("lanternjobs"),
            ERROR_WAIT,
        );

        assert_eq!(decision.status, DecisionStatus::SkippedForStart);
        assert_eq!(decision.seconds_remaining, SKIPPED_WAIT);
        assert!(!decision.is_due());
    }

    #[test]
    fn test_start_override_beats_error_wait() {
        let now = Utc::now();
        let state = SourceState {
            last_error_time: Some(now),
            ..Default::default()
        };

        let decision = decide(
            now,
            &test_config("ironboard"),
            &state,
            Some("ironboard"),
            ERROR_WAIT,
        );

        assert_eq!(decision.status, DecisionStatus::StartingTarget);
    }
}
