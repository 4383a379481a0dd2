//! Configuration module
//!
//! Handles loading, parsing, and validating the TOML configuration file,
//! plus the keyword-list fingerprint used to invalidate stale resume cursors.

pub mod parser;
pub mod types;
pub mod validation;

pub use parser::{keyword_fingerprint, load_config};
pub use types::{Config, OutputConfig, SchedulerConfig, SearchConfig, SourceConfig};
pub use validation::validate;
