//! Course sync engine.
//!
//! One run fetches the course list and every course's sections, stores them,
//! and notifies about modules that appeared in courses the user already had.
//! Courses seen for the first time are stored silently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::{Course, RemoteData, Section};
use crate::notify::NotificationEmitter;
use crate::sync::scheduler::Scheduler;
use crate::sync::session::Session;
use crate::sync::store::LocalStore;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// No session. Future runs were cancelled.
    NotLoggedIn,
    /// The course list could not be fetched.
    ListFetchFailed,
    /// The fetched course list could not be stored.
    StoreFailed,
    /// Every course was processed, possibly with per-course failures.
    Completed,
    /// Another run was in progress; nothing was done.
    AlreadyRunning,
}

/// Result of one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub end: RunEnd,
    /// Whether the run should be retried soon instead of at the next period.
    pub reschedule: bool,
    /// Courses stored for the first time.
    pub new_courses: Vec<Course>,
    /// Modules added to previously known courses.
    pub added_modules: usize,
    /// `(course id, module id)` pairs a notification was posted for.
    pub notified_modules: Vec<(u64, u64)>,
    /// Courses whose sections could not be fetched or stored.
    pub failed_courses: Vec<u64>,
}

impl RunOutcome {
    fn ended(end: RunEnd, reschedule: bool) -> Self {
        Self {
            end,
            reschedule,
            new_courses: Vec::new(),
            added_modules: 0,
            notified_modules: Vec::new(),
            failed_courses: Vec::new(),
        }
    }
}

/// Clears the running flag when a run ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
        tracing::debug!("Sync run finished");
    }
}

/// Periodic course synchroniser.
pub struct SyncEngine {
    remote: Arc<dyn RemoteData>,
    store: Arc<dyn LocalStore>,
    session: Arc<dyn Session>,
    emitter: Arc<NotificationEmitter>,
    scheduler: Arc<dyn Scheduler>,
    running: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteData>,
        store: Arc<dyn LocalStore>,
        session: Arc<dyn Session>,
        emitter: Arc<NotificationEmitter>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            remote,
            store,
            session,
            emitter,
            scheduler,
            running: AtomicBool::new(false),
        }
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one sync pass.
    pub async fn run_once(&self) -> RunOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Sync run already in progress, skipping");
            return RunOutcome::ended(RunEnd::AlreadyRunning, false);
        }
        let _running = RunningGuard(&self.running);
        tracing::debug!("Sync run started");

        if !self.session.is_logged_in() {
            tracing::info!("Not logged in, cancelling scheduled syncs");
            self.scheduler.cancel_all();
            return RunOutcome::ended(RunEnd::NotLoggedIn, false);
        }

        let courses = match self.remote.fetch_course_list().await {
            Ok(courses) => courses,
            Err(e) => {
                tracing::warn!("Could not fetch course list: {}", e);
                self.session.revalidate().await;
                return RunOutcome::ended(RunEnd::ListFetchFailed, true);
            }
        };
        tracing::info!("Fetched {} course(s)", courses.len());

        let mut outcome = RunOutcome::ended(RunEnd::Completed, false);

        // Fetch everything before writing anything
        let mut fetched: Vec<(&Course, Vec<Section>)> = Vec::with_capacity(courses.len());
        for course in &courses {
            match self.remote.fetch_course_sections(course).await {
                Ok(sections) => fetched.push((course, sections)),
                Err(e) => {
                    tracing::warn!("Skipping {} ({}): {}", course.name(), course.id, e);
                    outcome.failed_courses.push(course.id);
                }
            }
        }

        outcome.new_courses = match self.store.replace_course_list(&courses) {
            Ok(new_courses) => new_courses,
            Err(e) => {
                tracing::warn!("Could not store course list: {}", e);
                return RunOutcome::ended(RunEnd::StoreFailed, true);
            }
        };

        for (course, sections) in fetched {
            let added = match self.store.replace_course_sections(course.id, &sections) {
                Ok(added) => added,
                Err(e) => {
                    tracing::warn!("Could not store sections of {}: {}", course.name(), e);
                    outcome.failed_courses.push(course.id);
                    continue;
                }
            };

            if outcome.new_courses.iter().any(|c| c.id == course.id) {
                tracing::debug!("{} is new, not notifying {} module(s)", course.name(), added.len());
                continue;
            }

            outcome.added_modules += added.len();
            for module in &added {
                match self.emitter.emit(course, module) {
                    Ok(true) => outcome.notified_modules.push((course.id, module.id)),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("Could not notify module {}: {}", module.id, e),
                }
            }
        }

        tracing::info!(
            "Sync done: {} new course(s), {} new module(s), {} failed course(s)",
            outcome.new_courses.len(),
            outcome.added_modules,
            outcome.failed_courses.len()
        );
        outcome
    }
}
