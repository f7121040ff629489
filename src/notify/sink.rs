//! Where notifications end up.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use console::style;

use crate::error::Result;
use crate::notify::record::{Notification, NotificationId};

/// Host notification facility. Grouping by key is the host's job.
pub trait NotificationSink: Send + Sync {
    /// Post or replace the notification with `notification.id`.
    fn post(&self, notification: &Notification) -> Result<()>;
}

/// Prints notifications to the terminal. Summaries are not printed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn post(&self, notification: &Notification) -> Result<()> {
        if notification.is_summary {
            tracing::debug!("Summary {} for {}", notification.id, notification.group);
            return Ok(());
        }

        println!(
            "{} {}: {}",
            style("NEW").magenta().bold(),
            style(&notification.title).bold(),
            notification.body
        );
        if let Some(url) = &notification.target_url {
            println!("    {}", style(url).dim());
        }
        Ok(())
    }
}

/// Keeps the latest record per id, like a notification shade.
#[derive(Debug, Default)]
pub struct MemorySink {
    posted: Mutex<BTreeMap<NotificationId, Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<NotificationId, Notification>> {
        self.posted.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All live notifications, ordered by id.
    pub fn posted(&self) -> Vec<Notification> {
        self.lock().values().cloned().collect()
    }

    pub fn summaries(&self) -> Vec<Notification> {
        self.posted().into_iter().filter(|n| n.is_summary).collect()
    }

    pub fn children(&self) -> Vec<Notification> {
        self.posted().into_iter().filter(|n| !n.is_summary).collect()
    }
}

impl NotificationSink for MemorySink {
    fn post(&self, notification: &Notification) -> Result<()> {
        self.lock().insert(notification.id, notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_replaces_same_id() {
        let sink = MemorySink::new();
        sink.post(&Notification::child(1, 9, "A".into(), "old".into(), "u".into()))
            .unwrap();
        sink.post(&Notification::child(1, 9, "A".into(), "new".into(), "u".into()))
            .unwrap();

        let children = sink.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].body, "new");
    }
}
