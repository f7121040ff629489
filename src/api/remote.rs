//! Remote course data seam.

use async_trait::async_trait;

use crate::api::types::{Course, Section};
use crate::error::Result;

/// Source of the user's current course state.
///
/// An `Err` is distinguishable from an empty list: a course list that fails
/// to load is a transient failure, an empty one means no enrolments.
#[async_trait]
pub trait RemoteData: Send + Sync {
    /// Fetch the list of enrolled courses.
    async fn fetch_course_list(&self) -> Result<Vec<Course>>;

    /// Fetch the sections and modules of one course.
    async fn fetch_course_sections(&self, course: &Course) -> Result<Vec<Section>>;
}
