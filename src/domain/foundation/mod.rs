//! Foundation value objects shared across the subsystem.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{NotificationId, SessionId, UserId};
pub use timestamp::Timestamp;
