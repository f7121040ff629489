//! Direct filesystem backend.

use std::path::PathBuf;

use crate::config::BackendKind;
use crate::error::{Error, Result};
use crate::fs::backend::{Location, StorageBackend};
use crate::fs::naming::is_partial;
use crate::fs::paths::{course_dir, course_file_path};

/// Files live at `<download_root>/<root_folder>/<course>/<file>` and the
/// listing is the directory contents.
#[derive(Debug, Clone)]
pub struct DirectStorage {
    download_root: PathBuf,
    root_folder: String,
}

impl DirectStorage {
    pub fn new(download_root: PathBuf, root_folder: String) -> Self {
        Self {
            download_root,
            root_folder,
        }
    }
}

impl StorageBackend for DirectStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Direct
    }

    fn destination(&self, course_name: &str, file_name: &str) -> PathBuf {
        course_file_path(
            &self.download_root,
            &self.root_folder,
            course_name,
            file_name,
        )
    }

    fn resolve(&self, course_name: &str, file_name: &str) -> Result<Location> {
        let path = self.destination(course_name, file_name);
        if path.is_file() {
            Ok(Location::File(path))
        } else {
            Err(Error::FileNotFound(file_name.to_string()))
        }
    }

    fn list(&self, course_name: &str) -> Result<Vec<String>> {
        let dir = course_dir(&self.download_root, &self.root_folder, course_name);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !is_partial(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        Ok(names)
    }

    fn delete(&self, course_name: &str, file_name: &str) -> Result<()> {
        let path = self.destination(course_name, file_name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
