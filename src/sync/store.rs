//! Local course snapshots.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::{Course, Module, Section};
use crate::error::Result;

const COURSES_FILE: &str = "courses.json";
const SECTIONS_DIR: &str = "sections";

/// Persistence for the last seen course state.
pub trait LocalStore: Send + Sync {
    /// Replace the stored course list and return the courses that were not
    /// stored before. Courses missing from `courses` are forgotten along
    /// with their section snapshots.
    fn replace_course_list(&self, courses: &[Course]) -> Result<Vec<Course>>;

    /// Replace a course's stored sections and return the modules that were
    /// not in the previous snapshot. With no previous snapshot the new one
    /// becomes the baseline and nothing is reported.
    fn replace_course_sections(&self, course_id: u64, sections: &[Section]) -> Result<Vec<Module>>;

    /// The stored course list.
    fn courses(&self) -> Result<Vec<Course>>;

    /// The stored sections of a course, if any.
    fn sections(&self, course_id: u64) -> Result<Option<Vec<Section>>>;
}

/// JSON snapshot files under a state directory:
/// `courses.json` plus `sections/<course id>.json`.
#[derive(Debug)]
pub struct JsonCourseStore {
    dir: PathBuf,
    write: Mutex<()>,
}

impl JsonCourseStore {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir.join(SECTIONS_DIR))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            write: Mutex::new(()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn courses_path(&self) -> PathBuf {
        self.dir.join(COURSES_FILE)
    }

    fn sections_path(&self, course_id: u64) -> PathBuf {
        self.dir.join(SECTIONS_DIR).join(format!("{}.json", course_id))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn module_ids(sections: &[Section]) -> HashSet<u64> {
    sections
        .iter()
        .flat_map(|s| s.modules.iter().map(|m| m.id))
        .collect()
}

impl LocalStore for JsonCourseStore {
    fn replace_course_list(&self, courses: &[Course]) -> Result<Vec<Course>> {
        let _guard = self.lock();
        let previous: Vec<Course> = read_json(&self.courses_path())?.unwrap_or_default();

        let known: HashSet<u64> = previous.iter().map(|c| c.id).collect();
        let fresh: HashSet<u64> = courses.iter().map(|c| c.id).collect();

        for gone in previous.iter().filter(|c| !fresh.contains(&c.id)) {
            tracing::debug!("Forgetting course {} ({})", gone.id, gone.name());
            match std::fs::remove_file(self.sections_path(gone.id)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        write_json(&self.courses_path(), courses)?;

        Ok(courses
            .iter()
            .filter(|c| !known.contains(&c.id))
            .cloned()
            .collect())
    }

    fn replace_course_sections(&self, course_id: u64, sections: &[Section]) -> Result<Vec<Module>> {
        let _guard = self.lock();
        let path = self.sections_path(course_id);
        let previous: Option<Vec<Section>> = read_json(&path)?;

        write_json(&path, sections)?;

        let Some(previous) = previous else {
            return Ok(Vec::new());
        };
        let known = module_ids(&previous);

        Ok(sections
            .iter()
            .flat_map(|s| s.modules.iter())
            .filter(|m| !known.contains(&m.id))
            .cloned()
            .collect())
    }

    fn courses(&self) -> Result<Vec<Course>> {
        Ok(read_json(&self.courses_path())?.unwrap_or_default())
    }

    fn sections(&self, course_id: u64) -> Result<Option<Vec<Section>>> {
        read_json(&self.sections_path(course_id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn course(id: u64, name: &str) -> Course {
        Course {
            id,
            short_name: name.into(),
            full_name: format!("{} full", name),
        }
    }

    pub fn module(id: u64, name: &str) -> Module {
        Module {
            id,
            instance: id,
            name: name.into(),
            mod_name: "resource".into(),
            description: None,
            contents: Vec::new(),
        }
    }

    pub fn section(id: u64, modules: Vec<Module>) -> Section {
        Section {
            id,
            name: format!("Week {}", id),
            summary: String::new(),
            modules,
        }
    }

    #[test]
    fn test_new_courses_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCourseStore::open(dir.path()).unwrap();

        let added = store
            .replace_course_list(&[course(1, "CS F111"), course(2, "MATH F112")])
            .unwrap();
        assert_eq!(added.len(), 2);

        let added = store
            .replace_course_list(&[course(1, "CS F111"), course(2, "MATH F112"), course(3, "BIO F110")])
            .unwrap();
        assert_eq!(added, vec![course(3, "BIO F110")]);
        assert_eq!(store.courses().unwrap().len(), 3);
    }

    #[test]
    fn test_section_diff_reports_added_modules() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCourseStore::open(dir.path()).unwrap();

        let first = [section(10, vec![module(100, "A")])];
        assert!(store.replace_course_sections(1, &first).unwrap().is_empty());

        let second = [
            section(10, vec![module(100, "A")]),
            section(11, vec![module(101, "B"), module(102, "C")]),
        ];
        let added = store.replace_course_sections(1, &second).unwrap();
        let ids: Vec<u64> = added.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![101, 102]);

        // Same content again is not new
        assert!(store.replace_course_sections(1, &second).unwrap().is_empty());
    }

    #[test]
    fn test_module_moved_between_sections_is_not_new() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCourseStore::open(dir.path()).unwrap();
        store
            .replace_course_sections(1, &[section(10, vec![module(100, "A")])])
            .unwrap();

        let moved = [section(10, vec![]), section(11, vec![module(100, "A")])];
        assert!(store.replace_course_sections(1, &moved).unwrap().is_empty());
    }

    #[test]
    fn test_removed_course_drops_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCourseStore::open(dir.path()).unwrap();
        store
            .replace_course_list(&[course(1, "CS F111"), course(2, "MATH F112")])
            .unwrap();
        store
            .replace_course_sections(2, &[section(20, vec![module(200, "A")])])
            .unwrap();

        store.replace_course_list(&[course(1, "CS F111")]).unwrap();
        assert!(store.sections(2).unwrap().is_none());
        assert_eq!(store.courses().unwrap(), vec![course(1, "CS F111")]);
    }

    #[test]
    fn test_snapshots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonCourseStore::open(dir.path()).unwrap();
            store.replace_course_list(&[course(1, "CS F111")]).unwrap();
            store
                .replace_course_sections(1, &[section(10, vec![module(100, "A")])])
                .unwrap();
        }

        let store = JsonCourseStore::open(dir.path()).unwrap();
        assert!(store.replace_course_list(&[course(1, "CS F111")]).unwrap().is_empty());
        let added = store
            .replace_course_sections(1, &[section(10, vec![module(100, "A"), module(101, "B")])])
            .unwrap();
        assert_eq!(added, vec![module(101, "B")]);
    }
}
