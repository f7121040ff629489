//! Command-line argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{BackendKind, Config};

/// Course site file manager and new-content notifier.
#[derive(Parser, Debug)]
#[command(
    name = "cms-sync",
    version,
    about = "Download course files and get notified about new course content",
    long_about = "A CLI tool to download, open, share and delete course files from a \
                  Moodle-based course site, and to watch enrolled courses for newly added modules."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file.
    #[arg(short, long, global = true, default_value = "cms-sync.toml")]
    pub config: PathBuf,

    /// Web service token.
    #[arg(short, long, global = true, env = "CMS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of the course site.
    #[arg(long = "site-url", global = true, env = "CMS_SITE_URL")]
    pub site_url: Option<String>,

    /// Public downloads root.
    #[arg(short = 'd', long = "directory", global = true)]
    pub download_root: Option<PathBuf>,

    /// Storage backend.
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// Don't show new-content notifications.
    #[arg(long, global = true)]
    pub no_notifications: bool,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run one sync pass and exit.
    Sync,

    /// Keep syncing on a schedule.
    Daemon,

    /// List enrolled courses.
    Courses,

    /// List downloaded files of a course.
    List {
        /// Course id.
        course_id: u64,
    },

    /// Download a course file, replacing any stored copy.
    Download {
        /// Course id.
        course_id: u64,

        /// File name as shown on the course page.
        file_name: String,

        /// Download URL. Looked up in the course contents when omitted.
        #[arg(long)]
        url: Option<String>,

        /// Description recorded with the download.
        #[arg(long)]
        description: Option<String>,

        /// The file is a discussion attachment.
        #[arg(long)]
        attachment: bool,

        /// Seconds to wait for the download to finish.
        #[arg(long, default_value_t = 300)]
        timeout_secs: u64,
    },

    /// Open a downloaded file.
    Open {
        course_id: u64,
        file_name: String,
    },

    /// Share a downloaded file.
    Share {
        course_id: u64,
        file_name: String,
    },

    /// Delete a downloaded file.
    Delete {
        course_id: u64,
        file_name: String,
    },
}

impl Command {
    /// Whether the command needs a logged-in session up front.
    pub fn needs_login(&self) -> bool {
        matches!(self, Command::Courses | Command::Download { .. })
    }
}

/// CLI storage backend argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    /// Indexed if an index exists under the downloads root, else direct.
    Auto,
    /// Plain folders.
    Direct,
    /// Content index.
    Indexed,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => BackendKind::Auto,
            BackendArg::Direct => BackendKind::Direct,
            BackendArg::Indexed => BackendKind::Indexed,
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        if let Some(token) = &self.token {
            config.account.token = token.clone();
        }

        if let Some(site_url) = &self.site_url {
            config.account.site_url = site_url.clone();
        }

        if let Some(dir) = &self.download_root {
            config.storage.download_root = Some(dir.clone());
        }

        if let Some(backend) = self.backend {
            config.storage.backend = backend.into();
        }

        // Only override if set to non-default
        if self.no_notifications {
            config.sync.notifications_enabled = false;
        }
    }
}
