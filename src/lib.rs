//! Magpie: a patient job-board collector
//!
//! This crate implements the scheduling, resumption, and failure-isolation
//! layer for recurring collection runs against independent job boards. Each
//! board plugs in through the [`source::SourceAdapter`] trait; Magpie decides
//! when each source runs, where an interrupted run resumes, and keeps one bad
//! search keyword from aborting a whole run.

pub mod config;
pub mod executor;
pub mod records;
pub mod retry;
pub mod scheduler;
pub mod source;
pub mod state;

use thiserror::Error;

/// Main error type for Magpie operations
#[derive(Debug, Error)]
pub enum MagpieError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] state::StateError),

    #[error("Adapter error for {source_name}: {source}")]
    Adapter {
        source_name: String,
        source: source::AdapterError,
    },

    #[error("Record store error: {0}")]
    Records(#[from] records::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Magpie operations
pub type Result<T> = std::result::Result<T, MagpieError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use retry::{RetryClass, RetryPolicy, RetryTrace};
pub use scheduler::{decide, DecisionStatus, ScheduleDecision, Scheduler};
pub use source::{AdapterError, Checkpoint, SourceAdapter};
pub use state::{SourceState, StateStore};
