//! Error types for the cms-sync application.

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // API errors
    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    // Sync errors
    #[error("No active session")]
    SessionExpired,

    #[error("Failed to fetch course list: {0}")]
    TransientFetch(String),

    #[error("Course not found: {0}")]
    CourseNotFound(u64),

    #[error("Failed to fetch data for course {course_id}: {message}")]
    CourseFetch { course_id: u64, message: String },

    // Download errors
    #[error("Download could not be enqueued: {0}")]
    DownloadEnqueue(String),

    #[error("Download failed: {0}")]
    Download(String),

    // File errors
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No application found to open file - {0}")]
    NoViewerApp(String),

    #[error("No app found to share the file - {0}")]
    NoShareHandler(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Content index error: {0}")]
    Index(#[from] rusqlite::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error only affects the file or course it was raised for.
    ///
    /// Nothing in this crate is fatal to a long-running daemon; this is used
    /// by callers deciding whether to keep going after a failure.
    pub fn is_isolated(&self) -> bool {
        matches!(
            self,
            Error::CourseFetch { .. }
                | Error::DownloadEnqueue(_)
                | Error::Download(_)
                | Error::FileNotFound(_)
                | Error::NoViewerApp(_)
                | Error::NoShareHandler(_)
        )
    }
}

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const API_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const FILE_ERROR: i32 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_errors() {
        assert!(Error::FileNotFound("a.pdf".into()).is_isolated());
        assert!(Error::CourseFetch {
            course_id: 3,
            message: "timeout".into()
        }
        .is_isolated());
        assert!(!Error::SessionExpired.is_isolated());
        assert!(!Error::TransientFetch("offline".into()).is_isolated());
    }

    #[test]
    fn test_user_visible_messages() {
        assert_eq!(
            Error::NoShareHandler("notes.pdf".into()).to_string(),
            "No app found to share the file - notes.pdf"
        );
        assert_eq!(
            Error::NoViewerApp("notes.pdf".into()).to_string(),
            "No application found to open file - notes.pdf"
        );
    }
}
