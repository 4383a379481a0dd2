use crate::config::types::{Config, OutputConfig, SchedulerConfig, SourceConfig};
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scheduler_config(&config.scheduler)?;
    validate_output_config(&config.output)?;
    validate_sources(config)?;
    Ok(())
}

/// Validates scheduler configuration
fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.error_wait_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "error-wait-seconds must be >= 1, got {}",
            config.error_wait_seconds
        )));
    }

    if config.poll_interval_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "poll-interval-seconds must be >= 1, got {}",
            config.poll_interval_seconds
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.state_path.is_empty() {
        return Err(ConfigError::Validation(
            "state-path cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates source entries and the keyword lists they resolve to
fn validate_sources(config: &Config) -> Result<(), ConfigError> {
    if config.sources.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[source]] must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for source in &config.sources {
        validate_source(source)?;

        if !seen.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source name: '{}'",
                source.name
            )));
        }

        validate_keywords(&source.name, config.keywords_for(source))?;
    }

    Ok(())
}

/// Validates a single source entry
fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    if source.name.is_empty() {
        return Err(ConfigError::Validation(
            "Source name cannot be empty".to_string(),
        ));
    }

    if !source
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "Source name must contain only alphanumeric characters, hyphens, and underscores, got '{}'",
            source.name
        )));
    }

    if source.cadence_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "cadence-seconds for '{}' must be >= 1, got {}",
            source.name, source.cadence_seconds
        )));
    }

    Ok(())
}

/// Validates the effective keyword list of a source
fn validate_keywords(source_name: &str, keywords: &[String]) -> Result<(), ConfigError> {
    if keywords.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Source '{}' resolves to an empty keyword list",
            source_name
        )));
    }

    let mut seen = HashSet::new();
    for keyword in keywords {
        if keyword.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Source '{}' has a blank keyword",
                source_name
            )));
        }

        // Duplicates would make the positional resume cursor ambiguous
        if !seen.insert(keyword.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Source '{}' has duplicate keyword '{}'",
                source_name, keyword
            )));
        }
    }

    Ok(())
}
