//! File manager for one course.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::api::{Attachment, Content, ContentRef, Module};
use crate::download::facility::{DownloadFacility, JobId};
use crate::download::launcher::{Launcher, ShareIntent, ViewIntent};
use crate::download::tracker::DownloadTracker;
use crate::error::{Error, Result};
use crate::fs::{mime_for, CourseStorage, Storage, GENERIC_MIME};
use crate::sync::Session;

/// Called with the file name each time a requested download lands.
pub type CompletionCallback = Arc<dyn Fn(&str) + Send + Sync>;

type CallbackSlot = Arc<Mutex<Option<CompletionCallback>>>;

fn lock_slot(slot: &CallbackSlot) -> MutexGuard<'_, Option<CompletionCallback>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Download, open, share and delete the files of one course.
///
/// Call [`FileManager::attach`] to start listening for finished downloads
/// and [`FileManager::detach`] when the consumer goes away. Dropping the
/// manager detaches it.
pub struct FileManager {
    storage: Arc<CourseStorage>,
    tracker: Arc<DownloadTracker>,
    facility: Arc<dyn DownloadFacility>,
    launcher: Arc<dyn Launcher>,
    callback: CallbackSlot,
    listener: Option<JoinHandle<()>>,
}

impl FileManager {
    pub fn new(
        storage: &Storage,
        course_name: &str,
        facility: Arc<dyn DownloadFacility>,
        launcher: Arc<dyn Launcher>,
        session: Arc<dyn Session>,
    ) -> Self {
        let storage = Arc::new(storage.course(course_name));
        let tracker = Arc::new(DownloadTracker::new(
            storage.clone(),
            facility.clone(),
            session,
        ));

        Self {
            storage,
            tracker,
            facility,
            launcher,
            callback: Arc::new(Mutex::new(None)),
            listener: None,
        }
    }

    pub fn course_name(&self) -> &str {
        self.storage.course_name()
    }

    /// Install the completion callback, replacing any previous one.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *lock_slot(&self.callback) = Some(Arc::new(callback));
    }

    /// Start reacting to finished downloads. Does nothing outside a tokio
    /// runtime.
    pub fn attach(&mut self) {
        if self.is_attached() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, not listening for finished downloads");
            return;
        };

        let mut finished = self.facility.subscribe();
        let tracker = self.tracker.clone();
        let callback = self.callback.clone();
        let course = self.course_name().to_string();

        self.listener = Some(runtime.spawn(async move {
            loop {
                match finished.recv().await {
                    // Missed wake-ups are covered by the full rescan
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        dispatch_completions(&tracker, &callback);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("Download listener for {} stopped", course);
        }));
        tracing::debug!("Attached download listener for {}", self.course_name());
    }

    /// Stop reacting to finished downloads.
    pub fn detach(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            tracing::debug!("Detached download listener for {}", self.course_name());
        }
    }

    pub fn is_attached(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| !listener.is_finished())
    }

    /// Process a wake-up directly and return the names that completed.
    pub fn handle_download_finished(&self) -> Vec<String> {
        dispatch_completions(&self.tracker, &self.callback)
    }

    /// Download a module's file, replacing any stored copy.
    pub fn download_content(&self, content: &Content, module: &Module) -> Result<JobId> {
        self.download(&ContentRef::from_module(content, module))
    }

    /// Download a discussion attachment, replacing any stored copy.
    pub fn download_attachment(&self, attachment: &Attachment, description: &str) -> Result<JobId> {
        self.download(&ContentRef::from_attachment(attachment, description))
    }

    pub fn download(&self, content: &ContentRef) -> Result<JobId> {
        self.tracker.request(content)
    }

    /// Open a stored file in its viewer, falling back to a generic type and
    /// an application chooser when nothing handles the real type.
    pub fn open(&self, file_name: &str) -> Result<()> {
        let location = self.storage.resolve(file_name)?;
        let intent = ViewIntent {
            path: location.path().to_path_buf(),
            mime: mime_for(file_name),
            chooser_title: None,
        };

        match self.launcher.view(&intent) {
            Err(Error::NoViewerApp(_)) => {
                tracing::debug!("No viewer for {}, asking the user", intent.mime);
                let fallback = ViewIntent {
                    mime: GENERIC_MIME.to_string(),
                    chooser_title: Some(format!(
                        "No application found to open file - {}",
                        file_name
                    )),
                    ..intent
                };
                self.launcher.view(&fallback)
            }
            other => other,
        }
    }

    /// Hand a stored file to a sharing target.
    pub fn share(&self, file_name: &str) -> Result<()> {
        let location = self.storage.resolve(file_name)?;
        self.launcher.share(&ShareIntent {
            path: location.path().to_path_buf(),
            mime: GENERIC_MIME.to_string(),
            title: "Share File".to_string(),
        })
    }

    /// Delete a stored file. Deleting a missing file is a no-op.
    pub fn delete(&self, file_name: &str) -> Result<()> {
        self.storage.delete(file_name)
    }

    pub fn delete_content(&self, content: &Content) -> Result<()> {
        self.delete(&content.file_name)
    }

    pub fn delete_attachment(&self, attachment: &Attachment) -> Result<()> {
        self.delete(&attachment.file_name)
    }

    /// Whether the file is in the (cached) listing.
    pub fn is_downloaded(&self, file_name: &str) -> bool {
        self.storage.contains(file_name).unwrap_or_else(|e| {
            tracing::warn!("Could not check {} in {}: {}", file_name, self.course_name(), e);
            false
        })
    }

    pub fn is_content_downloaded(&self, content: &Content) -> bool {
        self.is_downloaded(&content.file_name)
    }

    pub fn is_attachment_downloaded(&self, attachment: &Attachment) -> bool {
        self.is_downloaded(&attachment.file_name)
    }

    /// Sorted names of all stored files for the course.
    pub fn list_downloaded(&self) -> Result<Vec<String>> {
        Ok(self.storage.list()?.into_iter().collect())
    }

    /// Reload the listing from storage.
    pub fn reload(&self) -> Result<()> {
        self.storage.refresh().map(|_| ())
    }

    /// Names requested but not yet finished.
    pub fn pending(&self) -> Vec<String> {
        self.tracker.pending()
    }
}

impl Drop for FileManager {
    fn drop(&mut self) {
        self.detach();
    }
}

fn dispatch_completions(tracker: &DownloadTracker, callback: &CallbackSlot) -> Vec<String> {
    let completed = match tracker.on_download_finished() {
        Ok(completed) => completed,
        Err(e) => {
            tracing::warn!("Could not check finished downloads: {}", e);
            return Vec::new();
        }
    };

    // Call outside the lock so the callback may use the manager
    let callback = lock_slot(callback).clone();
    if let Some(callback) = callback {
        for name in &completed {
            callback(name);
        }
    }

    completed
}
