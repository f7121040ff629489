//! Storage backend seam.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::BackendKind;
use crate::error::Result;

/// Physical location of a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A plain file in the downloads tree.
    File(PathBuf),
    /// A file known to the content index under `id`.
    Indexed { id: u64, path: PathBuf },
}

impl Location {
    /// Filesystem path the location points at.
    pub fn path(&self) -> &Path {
        match self {
            Location::File(path) => path,
            Location::Indexed { path, .. } => path,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::File(path) => write!(f, "{}", path.display()),
            Location::Indexed { id, path } => write!(f, "#{} ({})", id, path.display()),
        }
    }
}

/// One of the two strategies for addressing downloaded course files.
///
/// All methods take the raw course name; implementations sanitize it.
pub trait StorageBackend: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> BackendKind;

    /// Where the download facility should write `file_name`.
    fn destination(&self, course_name: &str, file_name: &str) -> PathBuf;

    /// Resolve a logical file to its physical location.
    ///
    /// Returns `Error::FileNotFound` when nothing is stored under that name.
    fn resolve(&self, course_name: &str, file_name: &str) -> Result<Location>;

    /// Names of all files stored for a course.
    fn list(&self, course_name: &str) -> Result<Vec<String>>;

    /// Remove a file. Removing a missing file is not an error.
    fn delete(&self, course_name: &str, file_name: &str) -> Result<()>;
}
