//! Sync module.
//!
//! Provides:
//! - The session collaborator
//! - Local course snapshots and their diffs
//! - The periodic scheduler
//! - The course sync engine

pub mod engine;
pub mod scheduler;
pub mod session;
pub mod store;

pub use engine::{RunEnd, RunOutcome, SyncEngine};
pub use scheduler::{PeriodicScheduler, Scheduler};
pub use session::{ConfigSession, Session};
pub use store::{JsonCourseStore, LocalStore};
