//! Filesystem module.
//!
//! Provides:
//! - Naming rules for course folders and files
//! - The storage backend seam with direct and indexed strategies
//! - The content index behind the indexed strategy
//! - Per-course storage with a cached listing

pub mod backend;
pub mod course;
pub mod direct;
pub mod index;
pub mod indexed;
pub mod naming;
pub mod paths;

use std::path::Path;
use std::sync::Arc;

pub use backend::{Location, StorageBackend};
pub use course::CourseStorage;
pub use direct::DirectStorage;
pub use index::{ContentIndex, IndexEntry, IndexQuery, SqliteContentIndex};
pub use indexed::IndexedStorage;
pub use naming::{check_component, mime_for, sanitize_course_name, sanitize_filename, GENERIC_MIME};
pub use paths::{course_dir, ensure_dir};

use crate::config::BackendKind;
use crate::error::Result;

/// The backend chosen for this process, plus the index it needs kept up to
/// date when it is the indexed one.
#[derive(Clone)]
pub struct Storage {
    pub backend: Arc<dyn StorageBackend>,
    pub index: Option<Arc<dyn ContentIndex>>,
}

impl Storage {
    /// Pick the backend once. `Auto` goes indexed only when an index already
    /// exists under the downloads root.
    pub fn open(kind: BackendKind, download_root: &Path, root_folder: &str) -> Result<Self> {
        let kind = match kind {
            BackendKind::Auto if SqliteContentIndex::exists(download_root) => BackendKind::Indexed,
            BackendKind::Auto => BackendKind::Direct,
            other => other,
        };
        tracing::debug!("Using {} storage under {}", kind, download_root.display());

        match kind {
            BackendKind::Indexed => {
                let index: Arc<dyn ContentIndex> =
                    Arc::new(SqliteContentIndex::open(download_root)?);
                let backend = IndexedStorage::new(
                    download_root.to_path_buf(),
                    root_folder.to_string(),
                    index.clone(),
                );
                Ok(Self {
                    backend: Arc::new(backend),
                    index: Some(index),
                })
            }
            _ => Ok(Self {
                backend: Arc::new(DirectStorage::new(
                    download_root.to_path_buf(),
                    root_folder.to_string(),
                )),
                index: None,
            }),
        }
    }

    /// Scope the backend to one course.
    pub fn course(&self, course_name: &str) -> CourseStorage {
        CourseStorage::new(self.backend.clone(), course_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_selects_direct_without_index() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(BackendKind::Auto, dir.path(), "CMS").unwrap();
        assert_eq!(storage.backend.kind(), BackendKind::Direct);
        assert!(storage.index.is_none());
    }

    #[test]
    fn test_auto_selects_indexed_with_index() {
        let dir = tempfile::tempdir().unwrap();
        SqliteContentIndex::open(dir.path())
            .unwrap()
            .insert("CMS/Physics/", "a.pdf")
            .unwrap();

        let storage = Storage::open(BackendKind::Auto, dir.path(), "CMS").unwrap();
        assert_eq!(storage.backend.kind(), BackendKind::Indexed);
        assert!(storage.index.is_some());
        assert!(storage.course("Physics").contains("a.pdf").unwrap());
    }
}
