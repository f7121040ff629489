//! Background download facility.
//!
//! Jobs run on their own tokio tasks. When any job ends, successfully or
//! not, subscribers get a bare [`DownloadFinished`] wake-up that does not say
//! which job it was; consumers work out what changed by looking at storage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::fs::naming::partial_filename;
use crate::fs::{ensure_dir, ContentIndex};

/// Capacity of the wake-up channel. Lagging receivers only lose duplicates.
const WAKE_CAPACITY: usize = 64;

/// Unscoped "some download finished" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadFinished;

/// A download request handed to the facility.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: Url,
    pub destination: PathBuf,
    pub title: String,
    pub description: String,
}

/// Opaque handle returned for an accepted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub Uuid);

/// Something that runs downloads in the background.
pub trait DownloadFacility: Send + Sync {
    /// Accept a job. Fails without side effects if the job cannot be queued.
    fn enqueue(&self, job: DownloadJob) -> Result<JobId>;

    /// Receive a wake-up each time any job ends.
    fn subscribe(&self) -> broadcast::Receiver<DownloadFinished>;
}

/// Streams jobs over HTTP into the downloads tree.
pub struct HttpDownloadFacility {
    client: Client,
    download_root: PathBuf,
    index: Option<Arc<dyn ContentIndex>>,
    finished: broadcast::Sender<DownloadFinished>,
}

impl HttpDownloadFacility {
    /// Create a facility writing under `download_root`. When `index` is set,
    /// finished files are registered in it.
    pub fn new(download_root: PathBuf, index: Option<Arc<dyn ContentIndex>>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cms-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Api(format!("Failed to create HTTP client: {}", e)))?;
        let (finished, _) = broadcast::channel(WAKE_CAPACITY);

        Ok(Self {
            client,
            download_root,
            index,
            finished,
        })
    }
}

impl DownloadFacility for HttpDownloadFacility {
    fn enqueue(&self, job: DownloadJob) -> Result<JobId> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::DownloadEnqueue(format!("No async runtime: {}", e)))?;

        let parent = job
            .destination
            .parent()
            .ok_or_else(|| Error::DownloadEnqueue("Destination has no parent folder".into()))?;
        ensure_dir(parent).map_err(|e| {
            Error::DownloadEnqueue(format!("Cannot create {}: {}", parent.display(), e))
        })?;

        let id = JobId(Uuid::new_v4());
        let client = self.client.clone();
        let download_root = self.download_root.clone();
        let index = self.index.clone();
        let finished = self.finished.clone();

        tracing::debug!("Queued {} ({:?}): {}", job.title, id, job.description);
        runtime.spawn(async move {
            match run_job(&client, &job).await {
                Ok(bytes) => {
                    tracing::info!("Downloaded {} ({} bytes)", job.title, bytes);
                    if let Some(index) = index {
                        if let Err(e) = register(index.as_ref(), &download_root, &job.destination)
                        {
                            tracing::warn!("Failed to index {}: {}", job.title, e);
                        }
                    }
                }
                Err(e) => tracing::warn!("Failed to download {}: {}", job.title, e),
            }
            // Nobody listening is fine
            let _ = finished.send(DownloadFinished);
        });

        Ok(id)
    }

    fn subscribe(&self) -> broadcast::Receiver<DownloadFinished> {
        self.finished.subscribe()
    }
}

/// Stream a job to a hidden partial file, then move it into place.
async fn run_job(client: &Client, job: &DownloadJob) -> Result<u64> {
    let response = client.get(job.url.clone()).send().await?;

    if !response.status().is_success() {
        return Err(Error::Download(format!(
            "Failed to download file: HTTP {}",
            response.status()
        )));
    }

    let partial = partial_path(&job.destination)?;
    let mut file = File::create(&partial).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(Error::Download(format!("Stream error: {}", e)));
            }
        };
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, &job.destination).await?;

    Ok(downloaded)
}

fn partial_path(destination: &Path) -> Result<PathBuf> {
    let name = destination
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::InvalidFilename(destination.display().to_string()))?;
    Ok(destination.with_file_name(partial_filename(name)))
}

/// Add a finished file to the content index.
pub(crate) fn register(index: &dyn ContentIndex, download_root: &Path, destination: &Path) -> Result<()> {
    let parent = destination
        .parent()
        .and_then(|p| p.strip_prefix(download_root).ok())
        .ok_or_else(|| Error::Storage(format!("{} is outside the downloads root", destination.display())))?;
    let name = destination
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::InvalidFilename(destination.display().to_string()))?;

    let mut relative = String::new();
    for component in parent.components() {
        relative.push_str(&component.as_os_str().to_string_lossy());
        relative.push('/');
    }

    let entry = index.insert(&relative, name)?;
    tracing::debug!("Indexed {}{} as #{}", entry.relative_path, name, entry.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{IndexQuery, SqliteContentIndex};

    fn job(destination: PathBuf) -> DownloadJob {
        DownloadJob {
            url: Url::parse("http://127.0.0.1:9/a.pdf").unwrap(),
            destination,
            title: "a.pdf".into(),
            description: String::new(),
        }
    }

    #[test]
    fn test_enqueue_without_runtime_fails() {
        let dir = tempfile::tempdir().unwrap();
        let facility = HttpDownloadFacility::new(dir.path().to_path_buf(), None).unwrap();
        let err = facility
            .enqueue(job(dir.path().join("CMS/Physics/a.pdf")))
            .unwrap_err();
        assert!(matches!(err, Error::DownloadEnqueue(_)));
    }

    #[tokio::test]
    async fn test_enqueue_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("CMS");
        std::fs::write(&blocker, b"not a folder").unwrap();

        let facility = HttpDownloadFacility::new(dir.path().to_path_buf(), None).unwrap();
        let err = facility
            .enqueue(job(blocker.join("Physics/a.pdf")))
            .unwrap_err();
        assert!(matches!(err, Error::DownloadEnqueue(_)));
    }

    #[tokio::test]
    async fn test_failed_job_still_wakes_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let facility = HttpDownloadFacility::new(dir.path().to_path_buf(), None).unwrap();
        let mut rx = facility.subscribe();

        facility
            .enqueue(job(dir.path().join("CMS/Physics/a.pdf")))
            .unwrap();

        let signal = tokio::time::timeout(std::time::Duration::from_secs(30), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal, DownloadFinished);
        assert!(!dir.path().join("CMS/Physics/a.pdf").exists());
    }

    #[test]
    fn test_register_uses_relative_folder() {
        let dir = tempfile::tempdir().unwrap();
        let index = SqliteContentIndex::open(dir.path()).unwrap();
        register(&index, dir.path(), &dir.path().join("CMS/CS_F111/a.pdf")).unwrap();

        let found = index
            .query(&IndexQuery {
                path_contains: "/CS_F111/",
                display_name: Some("a.pdf"),
            })
            .unwrap();
        assert_eq!(found[0].relative_path, "CMS/CS_F111/");
    }
}
