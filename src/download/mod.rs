//! Download module.
//!
//! This module provides:
//! - The background download facility and its wake-up signal
//! - Token handling for file URLs
//! - Pending download tracking for a course
//! - The file manager used to download, open, share and delete files
//! - Launching files in other applications

pub mod facility;
pub mod launcher;
pub mod manager;
pub mod token;
pub mod tracker;

pub use facility::{DownloadFacility, DownloadFinished, DownloadJob, HttpDownloadFacility, JobId};
pub use launcher::{Launcher, ShareIntent, SystemLauncher, ViewIntent};
pub use manager::{CompletionCallback, FileManager};
pub use token::append_token;
pub use tracker::DownloadTracker;
