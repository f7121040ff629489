//! Course site API module.
//!
//! This module provides:
//! - HTTP client for the Moodle REST web service
//! - The remote data seam used by the sync engine
//! - API response types

pub mod client;
pub mod remote;
pub mod types;

pub use client::{course_url, MoodleApi};
pub use remote::RemoteData;
pub use types::*;
