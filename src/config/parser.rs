use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let config: Config = toml::from_str(&content)?;

    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 fingerprint of an ordered keyword list
///
/// Resumption is positional against the keyword list, so a stored resume
/// cursor is only meaningful while the list is unchanged. The fingerprint is
/// persisted next to the cursor and compared on the next run.
///
/// # Arguments
///
/// * `keywords` - The ordered keyword list
///
/// # Returns
///
/// Hex-encoded SHA-256 hash over the keywords and their order
pub fn keyword_fingerprint(keywords: &[String]) -> String {
    let mut hasher = Sha256::new();
    for keyword in keywords {
        hasher.update(keyword.as_bytes());
        // Separator so ["ab","c"] and ["a","bc"] hash differently
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
