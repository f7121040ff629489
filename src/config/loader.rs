//! Configuration structures and loading logic.

use crate::config::modes::BackendKind;
use crate::error::{Error, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

/// Account credentials configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Base URL of the course site, e.g. `https://cms.example.edu`.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Web service token. Empty means logged out.
    #[serde(default)]
    pub token: String,

    /// Numeric user id on the course site.
    #[serde(default)]
    pub user_id: u64,
}

/// Download storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Public downloads root. Defaults to the platform download directory.
    #[serde(default)]
    pub download_root: Option<PathBuf>,

    /// Folder inside the downloads root that holds per-course folders.
    #[serde(default = "default_root_folder")]
    pub root_folder: String,

    /// Backend strategy (auto, direct, indexed).
    #[serde(default)]
    pub backend: BackendKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_root: None,
            root_folder: default_root_folder(),
            backend: BackendKind::default(),
        }
    }
}

/// Background sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between scheduled sync runs.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Upper bound of the random delay added to each period.
    #[serde(default = "default_jitter")]
    pub jitter_secs: u64,

    /// Whether new-content notifications are shown.
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    /// Directory for course snapshots. Defaults to the platform data dir.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            jitter_secs: default_jitter(),
            notifications_enabled: true,
            state_dir: None,
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            token: String::new(),
            user_id: 0,
        }
    }
}

fn default_site_url() -> String {
    "https://cms.bits-hyderabad.ac.in".to_string()
}

fn default_root_folder() -> String {
    "CMS".to_string()
}

fn default_interval() -> u64 {
    60 * 60
}

fn default_jitter() -> u64 {
    5 * 60
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one from cms-sync.example.toml",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the effective public downloads root.
    pub fn download_root(&self) -> PathBuf {
        self.storage.download_root.clone().unwrap_or_else(|| {
            UserDirs::new()
                .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("Downloads"))
        })
    }

    /// Get the effective directory for course snapshots.
    pub fn state_dir(&self) -> PathBuf {
        self.sync.state_dir.clone().unwrap_or_else(|| {
            ProjectDirs::from("in", "crux", "cms-sync")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".cms-sync"))
        })
    }

    /// Record the user id reported by the site and save to file if path provided.
    pub fn update_user_id(&mut self, user_id: u64, path: Option<&Path>) -> Result<()> {
        self.account.user_id = user_id;

        if let Some(path) = path {
            self.save(path)?;
        }

        Ok(())
    }

    /// Forget the stored token and save to file if path provided.
    pub fn clear_token(&mut self, path: Option<&Path>) -> Result<()> {
        self.account.token.clear();

        if let Some(path) = path {
            self.save(path)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.storage.root_folder, "CMS");
        assert_eq!(config.storage.backend, BackendKind::Auto);
        assert_eq!(config.sync.interval_secs, 3600);
        assert!(config.sync.notifications_enabled);
        assert!(config.account.token.is_empty());
    }

    #[test]
    fn test_load_and_clear_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cms-sync.toml");
        fs::write(
            &path,
            r#"
[account]
site_url = "https://cms.example.edu"
token = "0123456789abcdef0123456789abcdef"
user_id = 42

[storage]
backend = "indexed"
download_root = "/tmp/dl"

[sync]
notifications_enabled = false
"#,
        )
        .unwrap();

        let mut config = Config::load(&path).unwrap();
        assert_eq!(config.account.user_id, 42);
        assert_eq!(config.storage.backend, BackendKind::Indexed);
        assert_eq!(config.download_root(), PathBuf::from("/tmp/dl"));
        assert!(!config.sync.notifications_enabled);

        config.clear_token(Some(&path)).unwrap();
        let reloaded = Config::load(&path).unwrap();
        assert!(reloaded.account.token.is_empty());
        assert_eq!(reloaded.account.user_id, 42);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/cms-sync.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
