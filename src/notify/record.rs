//! Notification records.

use std::fmt;

/// Stable identity of a posted notification. Posting again with the same id
/// replaces the earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NotificationId {
    /// Group summary for a course.
    Course(u64),
    /// Child entry for one module.
    Module(u64),
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationId::Course(id) => write!(f, "course-{}", id),
            NotificationId::Module(id) => write!(f, "module-{}", id),
        }
    }
}

/// Key shared by a course's summary and all of its children.
pub fn group_key(course_id: u64) -> String {
    format!("course-{}", course_id)
}

/// A record handed to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub group: String,
    /// Summaries mark the group and carry no module text.
    pub is_summary: bool,
    pub title: String,
    pub body: String,
    pub silent: bool,
    pub auto_dismiss: bool,
    /// Page opened when the notification is tapped.
    pub target_url: Option<String>,
}

impl Notification {
    pub fn summary(course_id: u64, title: &str) -> Self {
        Self {
            id: NotificationId::Course(course_id),
            group: group_key(course_id),
            is_summary: true,
            title: title.to_string(),
            body: String::new(),
            silent: true,
            auto_dismiss: false,
            target_url: None,
        }
    }

    pub fn child(course_id: u64, module_id: u64, title: String, body: String, target_url: String) -> Self {
        Self {
            id: NotificationId::Module(module_id),
            group: group_key(course_id),
            is_summary: false,
            title,
            body,
            silent: false,
            auto_dismiss: true,
            target_url: Some(target_url),
        }
    }
}
