//! State module for per-source runtime state
//!
//! # Components
//!
//! - `SourceState`: the persisted runtime state of one source (resume cursor,
//!   last execution/error times, outstanding failed keywords)
//! - `StateStore`: durable file-backed store, one record per source name,
//!   rewritten in full on every mutation
//! - `ResumeCursor`: positional cursor over the ordered keyword list used to
//!   resume an interrupted run

mod resume;
mod source_state;
mod store;

pub use resume::{ResumeCursor, SkipDecision};
pub use source_state::SourceState;
pub use store::{StateError, StateStore};
