use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Persisted runtime state of one source
///
/// Mutated exclusively by the executor for that source and read by the
/// scheduler; never shared across sources. A source with no resume cursor and
/// no failed keywords is "clean" and only eligible for cadence-based
/// scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    /// The in-progress search keyword, set only while a run is incomplete
    #[serde(rename = "resume-keyword", skip_serializing_if = "Option::is_none", default)]
    pub resume_keyword: Option<String>,

    /// Page to resume the in-progress keyword at (always >= 1)
    #[serde(rename = "resume-page", default = "default_resume_page")]
    pub resume_page: u32,

    /// Start time of the last run that reached finalization
    #[serde(
        rename = "last-execution-time",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub last_execution_time: Option<DateTime<Utc>>,

    /// When the last run-level error was recorded
    #[serde(
        rename = "last-error-time",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub last_error_time: Option<DateTime<Utc>>,

    /// Message of the last run-level error
    #[serde(
        rename = "last-error-message",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub last_error_message: Option<String>,

    /// Keywords that failed during the most recent runs, retried on the next
    /// scheduled run
    #[serde(rename = "failed-keywords", default)]
    pub failed_keywords: BTreeSet<String>,

    /// Fingerprint of the keyword list the resume cursor was written against
    #[serde(
        rename = "keywords-fingerprint",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub keywords_fingerprint: Option<String>,
}

fn default_resume_page() -> u32 {
    1
}

impl Default for SourceState {
    fn default() -> Self {
        Self {
            resume_keyword: None,
            resume_page: 1,
            last_execution_time: None,
            last_error_time: None,
            last_error_message: None,
            failed_keywords: BTreeSet::new(),
            keywords_fingerprint: None,
        }
    }
}

impl SourceState {
    /// Whether an interrupted run left a resume cursor behind
    pub fn has_resume(&self) -> bool {
        self.resume_keyword.is_some()
    }

    /// Whether this source is clean: nothing to resume, nothing to retry
    pub fn is_clean(&self) -> bool {
        self.resume_keyword.is_none() && self.failed_keywords.is_empty()
    }

    /// Drops the resume cursor, leaving everything else intact
    pub fn clear_resume(&mut self) {
        self.resume_keyword = None;
        self.resume_page = 1;
    }

    /// Drops the error fields
    pub fn clear_error(&mut self) {
        self.last_error_time = None;
        self.last_error_message = None;
    }
}
