//! Session collaborator.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::api::MoodleApi;
use crate::config::Config;
use crate::error::Error;

/// Login state and user preferences.
#[async_trait]
pub trait Session: Send + Sync {
    fn is_logged_in(&self) -> bool;

    fn notifications_enabled(&self) -> bool;

    /// Token appended to download URLs. Empty when logged out.
    fn auth_token(&self) -> String;

    /// Ask the site whether the token is still accepted and log out if not.
    async fn revalidate(&self);
}

/// Session backed by the configuration file.
///
/// Logging out clears the token and, when a config path is known, writes
/// that back so later processes start logged out too.
pub struct ConfigSession {
    config: Mutex<Config>,
    config_path: Option<PathBuf>,
    api: Option<Arc<MoodleApi>>,
}

impl ConfigSession {
    pub fn new(config: Config, config_path: Option<PathBuf>, api: Option<Arc<MoodleApi>>) -> Self {
        Self {
            config: Mutex::new(config),
            config_path,
            api,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the token.
    pub fn log_out(&self) {
        let mut config = self.lock();
        if let Err(e) = config.clear_token(self.config_path.as_deref()) {
            tracing::warn!("Failed to save logged-out config: {}", e);
        }
        tracing::info!("Logged out");
    }
}

#[async_trait]
impl Session for ConfigSession {
    fn is_logged_in(&self) -> bool {
        !self.lock().account.token.is_empty()
    }

    fn notifications_enabled(&self) -> bool {
        self.lock().sync.notifications_enabled
    }

    fn auth_token(&self) -> String {
        self.lock().account.token.clone()
    }

    async fn revalidate(&self) {
        let Some(api) = self.api.as_ref() else {
            return;
        };

        match api.get_site_info().await {
            Ok(info) => tracing::debug!("Token still valid for {}", info.username),
            Err(Error::Authentication(message)) => {
                tracing::warn!("Token rejected: {}", message);
                self.log_out();
            }
            // Network trouble says nothing about the token
            Err(e) => tracing::debug!("Could not revalidate token: {}", e),
        }
    }
}
