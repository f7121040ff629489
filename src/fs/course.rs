//! Per-course view of a storage backend with a cached listing.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::fs::backend::{Location, StorageBackend};
use crate::fs::naming::check_component;

/// One course's files on a fixed backend.
///
/// The listing is loaded on first use and kept until `invalidate` or
/// `refresh`. Deletes through this type invalidate it themselves; download
/// completions must be followed by a `refresh`.
///
/// Every file name is checked to be a single path component before it
/// reaches the backend, so one course can never address another's files.
pub struct CourseStorage {
    backend: Arc<dyn StorageBackend>,
    course_name: String,
    listing: Mutex<Option<BTreeSet<String>>>,
}

impl CourseStorage {
    pub fn new(backend: Arc<dyn StorageBackend>, course_name: impl Into<String>) -> Self {
        Self {
            backend,
            course_name: course_name.into(),
            listing: Mutex::new(None),
        }
    }

    pub fn course_name(&self) -> &str {
        &self.course_name
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, Option<BTreeSet<String>>> {
        self.listing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn destination(&self, file_name: &str) -> Result<PathBuf> {
        check_component(file_name)?;
        Ok(self.backend.destination(&self.course_name, file_name))
    }

    pub fn resolve(&self, file_name: &str) -> Result<Location> {
        check_component(file_name)?;
        self.backend.resolve(&self.course_name, file_name)
    }

    /// Remove a file and drop the cached listing.
    pub fn delete(&self, file_name: &str) -> Result<()> {
        check_component(file_name)?;
        let result = self.backend.delete(&self.course_name, file_name);
        self.invalidate();
        result
    }

    /// Forget the cached listing; the next read reloads it.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    /// Reload the listing from the backend now.
    pub fn refresh(&self) -> Result<BTreeSet<String>> {
        let names: BTreeSet<String> = self.backend.list(&self.course_name)?.into_iter().collect();
        *self.lock() = Some(names.clone());
        Ok(names)
    }

    /// The cached listing, loading it if needed.
    pub fn list(&self) -> Result<BTreeSet<String>> {
        if let Some(names) = self.lock().as_ref() {
            return Ok(names.clone());
        }
        self.refresh()
    }

    pub fn contains(&self, file_name: &str) -> Result<bool> {
        check_component(file_name)?;
        if let Some(names) = self.lock().as_ref() {
            return Ok(names.contains(file_name));
        }
        Ok(self.refresh()?.contains(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fs::direct::DirectStorage;

    #[test]
    fn test_listing_is_cached_until_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(DirectStorage::new(dir.path().to_path_buf(), "CMS".into()));
        let storage = CourseStorage::new(backend, "Physics");

        assert!(!storage.contains("a.pdf").unwrap());

        let path = storage.destination("a.pdf").unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();

        // Stale until refreshed
        assert!(!storage.contains("a.pdf").unwrap());
        storage.refresh().unwrap();
        assert!(storage.contains("a.pdf").unwrap());
    }

    #[test]
    fn test_delete_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(DirectStorage::new(dir.path().to_path_buf(), "CMS".into()));
        let storage = CourseStorage::new(backend, "Physics");

        let path = storage.destination("a.pdf").unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();
        assert!(storage.contains("a.pdf").unwrap());

        storage.delete("a.pdf").unwrap();
        assert!(!storage.contains("a.pdf").unwrap());
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn test_names_cannot_leave_the_course() {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn StorageBackend> =
            Arc::new(DirectStorage::new(dir.path().to_path_buf(), "CMS".into()));
        let physics = CourseStorage::new(backend.clone(), "Physics");
        let chemistry = CourseStorage::new(backend, "Chemistry");

        let notes = chemistry.destination("notes.pdf").unwrap();
        std::fs::create_dir_all(notes.parent().unwrap()).unwrap();
        std::fs::write(&notes, b"data").unwrap();
        std::fs::create_dir_all(dir.path().join("CMS/Physics")).unwrap();

        let escape = "../Chemistry/notes.pdf";
        assert!(matches!(physics.delete(escape), Err(Error::InvalidFilename(_))));
        assert!(physics.resolve(escape).is_err());
        assert!(physics.contains(escape).is_err());
        assert!(physics.destination(escape).is_err());
        assert!(physics.destination("..").is_err());

        assert!(notes.exists());
        assert!(chemistry.contains("notes.pdf").unwrap());
    }
}
