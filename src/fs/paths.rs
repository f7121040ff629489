//! Path and directory management.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs::naming::relative_course_dir;

/// Absolute folder holding one course's files.
pub fn course_dir(download_root: &Path, root_folder: &str, course_name: &str) -> PathBuf {
    download_root.join(relative_course_dir(root_folder, course_name))
}

/// Absolute path of one course file.
pub fn course_file_path(
    download_root: &Path,
    root_folder: &str,
    course_name: &str,
    file_name: &str,
) -> PathBuf {
    course_dir(download_root, root_folder, course_name).join(file_name)
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
