//! Application layer - orchestration services.
//!
//! Services receive their collaborators at construction (no process-wide
//! singletons): the notification service couples the durable store to the
//! room router, and the signaling coordinator drives the two-party call
//! protocol over the same router.

pub mod notifications;
pub mod signaling;

pub use notifications::{NotificationService, NotifyError, NotifyOutcome};
pub use signaling::{CallInvite, SignalingCoordinator, SignalingOptions};
