//! Pending download tracking.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::ContentRef;
use crate::download::facility::{DownloadFacility, DownloadJob, JobId};
use crate::download::token::append_token;
use crate::error::Result;
use crate::fs::{sanitize_filename, CourseStorage};
use crate::sync::Session;

/// Issues downloads for one course and works out which of them finished.
///
/// The pending set is only touched while its lock is held, and the listing
/// refresh on completion happens under the same lock, so a request racing a
/// completion signal sees either the state before or after it.
pub struct DownloadTracker {
    storage: Arc<CourseStorage>,
    facility: Arc<dyn DownloadFacility>,
    session: Arc<dyn Session>,
    pending: Mutex<BTreeSet<String>>,
}

impl DownloadTracker {
    pub fn new(
        storage: Arc<CourseStorage>,
        facility: Arc<dyn DownloadFacility>,
        session: Arc<dyn Session>,
    ) -> Self {
        Self {
            storage,
            facility,
            session,
            pending: Mutex::new(BTreeSet::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Download `content`, replacing any stored file of the same name.
    ///
    /// The name is only left pending if the facility accepted the job.
    pub fn request(&self, content: &ContentRef) -> Result<JobId> {
        let file_name = sanitize_filename(&content.file_name)?;
        let url = append_token(&content.url, &self.session.auth_token())?;
        let destination = self.storage.destination(&file_name)?;

        let mut pending = self.lock();
        self.storage.delete(&file_name)?;

        // Pending before enqueue so a fast finish is not missed
        pending.insert(file_name.clone());
        let job = DownloadJob {
            url,
            destination,
            title: file_name.clone(),
            description: content.description.clone(),
        };

        match self.facility.enqueue(job) {
            Ok(id) => {
                tracing::info!(
                    "Requested {} for {}",
                    file_name,
                    self.storage.course_name()
                );
                Ok(id)
            }
            Err(e) => {
                pending.remove(&file_name);
                tracing::warn!("Could not queue {}: {}", file_name, e);
                Err(e)
            }
        }
    }

    /// Handle one "some download finished" wake-up.
    ///
    /// Refreshes the listing and returns every pending name now present,
    /// removing them from the pending set. Several downloads finishing
    /// behind a single wake-up are all reported.
    pub fn on_download_finished(&self) -> Result<Vec<String>> {
        let mut pending = self.lock();
        let listing = self.storage.refresh()?;

        let completed: Vec<String> = pending
            .iter()
            .filter(|name| listing.contains(*name))
            .cloned()
            .collect();
        for name in &completed {
            pending.remove(name);
        }

        if !completed.is_empty() {
            tracing::debug!(
                "{} download(s) completed, {} still pending",
                completed.len(),
                pending.len()
            );
        }

        Ok(completed)
    }

    /// Names requested but not yet seen in storage.
    pub fn pending(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::ContentKind;
    use crate::error::Error;
    use crate::fs::{DirectStorage, StorageBackend};
    use async_trait::async_trait;
    use tokio::sync::broadcast;

    use crate::download::facility::{register, DownloadFinished};
    use crate::fs::ContentIndex;
    use std::path::{Path, PathBuf};

    pub struct StaticSession;

    #[async_trait]
    impl Session for StaticSession {
        fn is_logged_in(&self) -> bool {
            true
        }
        fn notifications_enabled(&self) -> bool {
            true
        }
        fn auth_token(&self) -> String {
            "tok".into()
        }
        async fn revalidate(&self) {}
    }

    /// Records jobs; completing them writes the files, registers them in the
    /// index when there is one, and `signal` fires the wake-up.
    pub struct FakeFacility {
        pub jobs: Mutex<Vec<DownloadJob>>,
        pub refuse: bool,
        pub finished: broadcast::Sender<DownloadFinished>,
        index: Option<(PathBuf, Arc<dyn ContentIndex>)>,
    }

    impl FakeFacility {
        pub fn new(refuse: bool) -> Self {
            Self {
                jobs: Mutex::new(Vec::new()),
                refuse,
                finished: broadcast::channel(16).0,
                index: None,
            }
        }

        pub fn indexing(download_root: &Path, index: Arc<dyn ContentIndex>) -> Self {
            Self {
                index: Some((download_root.to_path_buf(), index)),
                ..Self::new(false)
            }
        }

        /// Write every queued job's file without signalling.
        pub fn complete_all_silently(&self) {
            for job in self.jobs.lock().unwrap().drain(..) {
                std::fs::write(&job.destination, job.url.as_str()).unwrap();
                if let Some((root, index)) = &self.index {
                    register(index.as_ref(), root, &job.destination).unwrap();
                }
            }
        }

        pub fn signal(&self) {
            let _ = self.finished.send(DownloadFinished);
        }
    }

    impl DownloadFacility for FakeFacility {
        fn enqueue(&self, job: DownloadJob) -> Result<JobId> {
            if self.refuse {
                return Err(Error::DownloadEnqueue("storage unavailable".into()));
            }
            std::fs::create_dir_all(job.destination.parent().unwrap()).unwrap();
            self.jobs.lock().unwrap().push(job);
            Ok(JobId(uuid::Uuid::new_v4()))
        }

        fn subscribe(&self) -> broadcast::Receiver<DownloadFinished> {
            self.finished.subscribe()
        }
    }

    pub fn content(name: &str) -> ContentRef {
        ContentRef {
            file_name: name.into(),
            url: format!("https://cms.example.edu/pluginfile.php/1/{}?forcedownload=1", name),
            description: "Handout".into(),
            kind: ContentKind::Module,
        }
    }

    fn setup(refuse: bool) -> (tempfile::TempDir, Arc<CourseStorage>, Arc<FakeFacility>, DownloadTracker) {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn StorageBackend> =
            Arc::new(DirectStorage::new(dir.path().to_path_buf(), "CMS".into()));
        let storage = Arc::new(CourseStorage::new(backend, "CS/F111"));
        let facility = Arc::new(FakeFacility::new(refuse));
        let tracker = DownloadTracker::new(storage.clone(), facility.clone(), Arc::new(StaticSession));
        (dir, storage, facility, tracker)
    }

    #[test]
    fn test_request_records_pending_with_token() {
        let (dir, _storage, facility, tracker) = setup(false);
        tracker.request(&content("a.pdf")).unwrap();

        assert_eq!(tracker.pending(), vec!["a.pdf"]);
        let jobs = facility.jobs.lock().unwrap();
        assert!(jobs[0].url.as_str().ends_with("forcedownload=1&token=tok"));
        assert_eq!(jobs[0].destination, dir.path().join("CMS/CS_F111/a.pdf"));
        assert_eq!(jobs[0].description, "Handout");
    }

    #[test]
    fn test_refused_enqueue_is_not_pending() {
        let (_dir, _storage, _facility, tracker) = setup(true);
        let err = tracker.request(&content("a.pdf")).unwrap_err();
        assert!(matches!(err, Error::DownloadEnqueue(_)));
        assert!(tracker.pending().is_empty());
    }

    #[test]
    fn test_redownload_deletes_existing_first() {
        let (_dir, storage, facility, tracker) = setup(false);
        let old = storage.destination("a.pdf").unwrap();
        std::fs::create_dir_all(old.parent().unwrap()).unwrap();
        std::fs::write(&old, b"old").unwrap();
        assert!(storage.contains("a.pdf").unwrap());

        tracker.request(&content("a.pdf")).unwrap();

        // Gone before the new job produced anything
        assert!(!old.exists());
        assert!(!storage.contains("a.pdf").unwrap());
        assert_eq!(facility.jobs.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_one_wakeup_reports_every_finished_file() {
        let (_dir, storage, facility, tracker) = setup(false);
        tracker.request(&content("a.pdf")).unwrap();
        tracker.request(&content("b.pdf")).unwrap();
        tracker.request(&content("c.pdf")).unwrap();

        assert!(tracker.on_download_finished().unwrap().is_empty());

        // a and b land together, c is still running
        let c = facility.jobs.lock().unwrap().pop().unwrap();
        facility.complete_all_silently();
        facility.jobs.lock().unwrap().push(c);

        let completed = tracker.on_download_finished().unwrap();
        assert_eq!(completed, vec!["a.pdf", "b.pdf"]);
        assert_eq!(tracker.pending(), vec!["c.pdf"]);
        assert!(storage.contains("a.pdf").unwrap());

        // Already reported names are not reported again
        assert!(tracker.on_download_finished().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_escaping_names() {
        let (_dir, _storage, facility, tracker) = setup(false);
        assert!(tracker.request(&content("../a.pdf")).is_err());
        assert!(facility.jobs.lock().unwrap().is_empty());
        assert!(tracker.pending().is_empty());
    }
}
