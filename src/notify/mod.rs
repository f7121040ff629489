//! Notification module.
//!
//! Provides:
//! - Grouped notification records
//! - Markup to plain text for notification text
//! - The notification sink seam
//! - The emitter used by the sync engine

pub mod emitter;
pub mod html;
pub mod record;
pub mod sink;

pub use emitter::NotificationEmitter;
pub use html::HtmlText;
pub use record::{group_key, Notification, NotificationId};
pub use sink::{ConsoleSink, MemorySink, NotificationSink};
