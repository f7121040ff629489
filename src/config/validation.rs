//! Configuration validation logic.

use crate::config::loader::Config;
use crate::error::{Error, Result};
use regex::Regex;
use url::Url;

/// Moodle web service tokens are 32 lowercase hex characters.
const TOKEN_PATTERN: &str = r"^[0-9a-f]{32}$";

/// Shortest period the scheduler accepts.
const MIN_INTERVAL_SECS: u64 = 15 * 60;

/// Validate the entire configuration.
///
/// An empty token is allowed: it means the user is logged out, which the
/// sync engine handles on its own.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_site_url(&config.account.site_url)?;
    if !config.account.token.is_empty() {
        validate_token(&config.account.token)?;
    }
    validate_root_folder(&config.storage.root_folder)?;
    validate_interval(config.sync.interval_secs, config.sync.jitter_secs)?;

    Ok(())
}

/// Validate the course site URL.
pub fn validate_site_url(site_url: &str) -> Result<()> {
    if site_url.is_empty() {
        return Err(Error::MissingConfig("account.site_url".to_string()));
    }

    let url = Url::parse(site_url)?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(Error::ConfigValidation {
            field: "account.site_url".to_string(),
            message: format!("Unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(())
}

/// Validate the web service token.
pub fn validate_token(token: &str) -> Result<()> {
    let pattern = Regex::new(TOKEN_PATTERN)
        .map_err(|e| Error::Config(format!("Bad token pattern: {}", e)))?;

    if !pattern.is_match(token) {
        return Err(Error::ConfigValidation {
            field: "account.token".to_string(),
            message: "Token must be 32 hexadecimal characters".to_string(),
        });
    }

    Ok(())
}

/// Validate the root folder name.
pub fn validate_root_folder(root_folder: &str) -> Result<()> {
    if root_folder.trim().is_empty() {
        return Err(Error::MissingConfig("storage.root_folder".to_string()));
    }

    if root_folder.contains('/') || root_folder.contains('\\') || root_folder.contains("..") {
        return Err(Error::ConfigValidation {
            field: "storage.root_folder".to_string(),
            message: format!("'{}' must be a single folder name", root_folder),
        });
    }

    Ok(())
}

/// Validate the sync period.
pub fn validate_interval(interval_secs: u64, jitter_secs: u64) -> Result<()> {
    if interval_secs < MIN_INTERVAL_SECS {
        return Err(Error::ConfigValidation {
            field: "sync.interval_secs".to_string(),
            message: format!(
                "Interval must be at least {} seconds (got {})",
                MIN_INTERVAL_SECS, interval_secs
            ),
        });
    }

    if jitter_secs >= interval_secs {
        return Err(Error::ConfigValidation {
            field: "sync.jitter_secs".to_string(),
            message: "Jitter must be smaller than the interval".to_string(),
        });
    }

    Ok(())
}
