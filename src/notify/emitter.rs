//! New-module notifications.

use std::sync::Arc;

use crate::api::{course_url, Course, Module};
use crate::error::Result;
use crate::notify::html::HtmlText;
use crate::notify::record::Notification;
use crate::notify::sink::NotificationSink;
use crate::sync::Session;

/// Turns newly added modules into grouped notifications.
pub struct NotificationEmitter {
    sink: Arc<dyn NotificationSink>,
    session: Arc<dyn Session>,
    site_url: String,
    html: HtmlText,
}

impl NotificationEmitter {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        session: Arc<dyn Session>,
        site_url: &str,
    ) -> Result<Self> {
        Ok(Self {
            sink,
            session,
            site_url: site_url.to_string(),
            html: HtmlText::new()?,
        })
    }

    /// Post the course summary and a child for `module`.
    ///
    /// Returns `false` without posting when notifications are turned off.
    pub fn emit(&self, course: &Course, module: &Module) -> Result<bool> {
        if !self.session.notifications_enabled() {
            return Ok(false);
        }

        let title = self.html.to_plain(course.name());
        self.sink.post(&Notification::summary(course.id, &title))?;
        self.sink.post(&Notification::child(
            course.id,
            module.id,
            title,
            self.html.to_plain(&module.name),
            course_url(&self.site_url, course.id),
        ))?;

        tracing::debug!("Notified module {} of course {}", module.id, course.id);
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::notify::record::group_key;
    use crate::notify::sink::MemorySink;
    use crate::sync::store::tests::{course, module};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Session with switchable login and notification preference.
    pub struct ToggleSession {
        pub logged_in: AtomicBool,
        pub notifications: AtomicBool,
    }

    impl ToggleSession {
        pub fn new(logged_in: bool, notifications: bool) -> Self {
            Self {
                logged_in: AtomicBool::new(logged_in),
                notifications: AtomicBool::new(notifications),
            }
        }
    }

    #[async_trait]
    impl Session for ToggleSession {
        fn is_logged_in(&self) -> bool {
            self.logged_in.load(Ordering::SeqCst)
        }
        fn notifications_enabled(&self) -> bool {
            self.notifications.load(Ordering::SeqCst)
        }
        fn auth_token(&self) -> String {
            "tok".into()
        }
        async fn revalidate(&self) {}
    }

    #[test]
    fn test_emit_posts_grouped_summary_and_child() {
        let sink = Arc::new(MemorySink::new());
        let emitter = NotificationEmitter::new(
            sink.clone(),
            Arc::new(ToggleSession::new(true, true)),
            "https://cms.example.edu/",
        )
        .unwrap();

        let mut lab = module(40, "<span>Lab&nbsp;1</span>");
        lab.description = Some("<p>Bring a laptop</p>".into());
        assert!(emitter.emit(&course(3, "CS F111"), &lab).unwrap());
        assert!(emitter.emit(&course(3, "CS F111"), &module(41, "Quiz")).unwrap());

        let summaries = sink.summaries();
        let children = sink.children();
        assert_eq!(summaries.len(), 1);
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.group == group_key(3)));
        assert_eq!(summaries[0].group, group_key(3));
        assert_eq!(children[0].title, "CS F111");
        assert_eq!(children[0].body, "Lab 1");
        assert_eq!(
            children[0].target_url.as_deref(),
            Some("https://cms.example.edu/course/view.php?id=3")
        );
    }

    #[test]
    fn test_emit_is_noop_when_disabled() {
        let sink = Arc::new(MemorySink::new());
        let emitter = NotificationEmitter::new(
            sink.clone(),
            Arc::new(ToggleSession::new(true, false)),
            "https://cms.example.edu",
        )
        .unwrap();

        assert!(!emitter.emit(&course(3, "CS F111"), &module(40, "Lab")).unwrap());
        assert!(sink.posted().is_empty());
    }

    #[test]
    fn test_reemit_replaces_instead_of_duplicating() {
        let sink = Arc::new(MemorySink::new());
        let emitter = NotificationEmitter::new(
            sink.clone(),
            Arc::new(ToggleSession::new(true, true)),
            "https://cms.example.edu",
        )
        .unwrap();

        emitter.emit(&course(3, "CS F111"), &module(40, "Lab")).unwrap();
        emitter.emit(&course(3, "CS F111"), &module(40, "Lab")).unwrap();
        assert_eq!(sink.posted().len(), 2);
    }
}
