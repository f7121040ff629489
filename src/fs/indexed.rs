//! Content-index backend.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::BackendKind;
use crate::error::{Error, Result};
use crate::fs::backend::{Location, StorageBackend};
use crate::fs::index::{ContentIndex, IndexEntry, IndexQuery};
use crate::fs::naming::index_course_filter;
use crate::fs::paths::course_file_path;

/// Files are addressed through the content index. A file counts as stored
/// only once the index knows about it.
pub struct IndexedStorage {
    download_root: PathBuf,
    root_folder: String,
    index: Arc<dyn ContentIndex>,
}

impl IndexedStorage {
    pub fn new(download_root: PathBuf, root_folder: String, index: Arc<dyn ContentIndex>) -> Self {
        Self {
            download_root,
            root_folder,
            index,
        }
    }

    fn entry_path(&self, entry: &IndexEntry) -> PathBuf {
        let mut path = self.download_root.clone();
        path.extend(entry.relative_path.split('/').filter(|s| !s.is_empty()));
        path.join(&entry.display_name)
    }
}

impl StorageBackend for IndexedStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Indexed
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
        let filter = index_course_filter(course_name);
        let entries = self.index.query(&IndexQuery {
            path_contains: &filter,
            display_name: Some(file_name),
        })?;

        // First match in path order wins when a name repeats in subfolders
        entries
            .first()
            .map(|entry| Location::Indexed {
                id: entry.id,
                path: self.entry_path(entry),
            })
            .ok_or_else(|| Error::FileNotFound(file_name.to_string()))
    }

    fn list(&self, course_name: &str) -> Result<Vec<String>> {
        let filter = index_course_filter(course_name);
        let entries = self.index.query(&IndexQuery {
            path_contains: &filter,
            display_name: None,
        })?;

        Ok(entries.into_iter().map(|e| e.display_name).collect())
    }

    fn delete(&self, course_name: &str, file_name: &str) -> Result<()> {
        let filter = index_course_filter(course_name);
        let removed = self.index.remove(&IndexQuery {
            path_contains: &filter,
            display_name: Some(file_name),
        })?;

        for entry in &removed {
            let path = self.entry_path(entry);
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Deleted {} (#{})", path.display(), entry.id),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::index::SqliteContentIndex;
    use crate::fs::naming::index_relative_path;

    fn storage() -> (tempfile::TempDir, Arc<SqliteContentIndex>, IndexedStorage) {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(SqliteContentIndex::open(dir.path()).unwrap());
        let storage = IndexedStorage::new(dir.path().to_path_buf(), "CMS".into(), index.clone());
        (dir, index, storage)
    }

    fn store(storage: &IndexedStorage, index: &SqliteContentIndex, course: &str, file: &str) {
        let path = storage.destination(course, file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();
        index
            .insert(&index_relative_path("CMS", course), file)
            .unwrap();
    }

    #[test]
    fn test_unindexed_file_is_not_stored() {
        let (_dir, _index, storage) = storage();
        let path = storage.destination("Physics", "a.pdf");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();

        assert!(storage.list("Physics").unwrap().is_empty());
        assert!(matches!(
            storage.resolve("Physics", "a.pdf"),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_list_delete() {
        let (dir, index, storage) = storage();
        store(&storage, &index, "EEE/F111", "a.pdf");
        store(&storage, &index, "EEE/F111", "b.pdf");

        assert_eq!(storage.list("EEE/F111").unwrap(), vec!["a.pdf", "b.pdf"]);

        let location = storage.resolve("EEE/F111", "a.pdf").unwrap();
        assert!(matches!(location, Location::Indexed { .. }));
        assert_eq!(location.path(), dir.path().join("CMS/EEE_F111/a.pdf"));

        storage.delete("EEE/F111", "a.pdf").unwrap();
        assert!(!dir.path().join("CMS/EEE_F111/a.pdf").exists());
        assert_eq!(storage.list("EEE/F111").unwrap(), vec!["b.pdf"]);

        storage.delete("EEE/F111", "a.pdf").unwrap();
    }

    #[test]
    fn test_courses_do_not_share_names() {
        let (_dir, index, storage) = storage();
        store(&storage, &index, "CS", "notes.pdf");

        assert!(storage.resolve("XCS", "notes.pdf").is_err());
        assert!(storage.list("XCS").unwrap().is_empty());
        assert!(storage.resolve("CS", "notes.pdf").is_ok());
    }
}
