use serde::Deserialize;

/// Main configuration structure for Magpie
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

/// Scheduler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Cooldown after a failed run, independent of any source's cadence (seconds)
    #[serde(rename = "error-wait-seconds", default = "default_error_wait")]
    pub error_wait_seconds: i64,

    /// Upper bound on how long the run loop sleeps between passes (seconds)
    #[serde(rename = "poll-interval-seconds", default = "default_poll_interval")]
    pub poll_interval_seconds: i64,
}

fn default_error_wait() -> i64 {
    1800
}

fn default_poll_interval() -> i64 {
    60
}

/// Search term configuration shared by all sources
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Ordered list of search keywords; order matters for resumption
    pub keywords: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the runtime state file (TOML)
    #[serde(rename = "state-path")]
    pub state_path: String,

    /// Path to the SQLite database holding collected records
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Per-source configuration, immutable for the process lifetime
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Unique source name, also the key into the state file
    pub name: String,

    /// Minimum interval between successful runs of this source (seconds)
    #[serde(rename = "cadence-seconds")]
    pub cadence_seconds: i64,

    /// Close the source's browser tab/session when a run finishes
    #[serde(rename = "close-session-after-run", default)]
    pub close_session_after_run: bool,

    /// Never run automatically; only via an explicit manual invocation
    #[serde(rename = "ignore-automatic-schedule", default)]
    pub ignore_automatic_schedule: bool,

    /// Wait out one full cadence before the first-ever run
    #[serde(rename = "wait-before-first-run", default)]
    pub wait_before_first_run: bool,

    /// Extra per-page logging for this source
    #[serde(default)]
    pub debug: bool,

    /// Optional override of the global keyword list
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

impl Config {
    /// Returns the effective keyword list for a source (per-source override
    /// first, global list otherwise).
    pub fn keywords_for<'a>(&'a self, source: &'a SourceConfig) -> &'a [String] {
        source
            .keywords
            .as_deref()
            .unwrap_or(&self.search.keywords)
    }

    /// Finds a source config by name.
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}
