//! cms-sync - course file manager and new-content notifier
//!
//! This library keeps a local copy of course files from a Moodle-based course
//! site and tells the user when new modules show up in their courses.
//!
//! # Features
//!
//! - Download, open, share and delete course files by name
//! - Direct folder storage or an indexed downloads collection
//! - Completion tracking for background downloads
//! - Periodic course sync with per-course failure isolation
//! - Grouped notifications for modules added to known courses
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use cms_sync::{Config, MoodleApi, Storage};
//! use cms_sync::download::{FileManager, HttpDownloadFacility, SystemLauncher};
//! use cms_sync::sync::ConfigSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("cms-sync.toml"))?;
//!     let api = Arc::new(MoodleApi::new(
//!         &config.account.site_url,
//!         config.account.token.clone(),
//!         config.account.user_id,
//!     )?);
//!     let storage = Storage::open(
//!         config.storage.backend,
//!         &config.download_root(),
//!         &config.storage.root_folder,
//!     )?;
//!     let facility = Arc::new(HttpDownloadFacility::new(
//!         config.download_root(),
//!         storage.index.clone(),
//!     )?);
//!     let session = Arc::new(ConfigSession::new(config, None, Some(api)));
//!
//!     let mut manager = FileManager::new(
//!         &storage,
//!         "CS F111",
//!         facility,
//!         Arc::new(SystemLauncher),
//!         session,
//!     );
//!     manager.set_callback(|name| println!("{} is ready", name));
//!     manager.attach();
//!     // ... download, open, share
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod notify;
pub mod output;
pub mod sync;

// Re-exports for convenience
pub use api::{MoodleApi, RemoteData};
pub use config::{BackendKind, Config};
pub use download::{FileManager, HttpDownloadFacility};
pub use error::{Error, Result};
pub use fs::Storage;
pub use notify::NotificationEmitter;
pub use sync::{PeriodicScheduler, RunOutcome, SyncEngine};
