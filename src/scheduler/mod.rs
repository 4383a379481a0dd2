//! Scheduler module
//!
//! `decision` holds the pure per-source readiness computation; `runner` holds
//! the loop that executes ready sources and sleeps between passes.

pub mod decision;
pub mod runner;

pub use decision::{decide, DecisionStatus, ScheduleDecision, WaitKind, SKIPPED_WAIT};
pub use runner::Scheduler;
