//! NotificationStore port - Interface to the durable notification store.
//!
//! The store is the authoritative home of a notification. This subsystem
//! only ever creates records; reading, listing and marking-as-read belong to
//! the CRUD side of the backend and are out of scope here.

use async_trait::async_trait;

use crate::domain::notification::{NewNotification, Notification};

/// Errors surfaced by the durable store.
///
/// A failed `create` must propagate to the domain-event caller: no push is
/// allowed for a notification that does not durably exist.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PersistenceError {
    /// The store could not be reached at all.
    #[error("notification store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or failed the write.
    #[error("failed to persist notification: {0}")]
    WriteFailed(String),
}

/// Port for creating durable notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a notification, returning the stored record.
    ///
    /// Implementations assign the id and creation time if the backing store
    /// does not; the returned record is what gets pushed to live sessions.
    async fn create(&self, notification: NewNotification)
        -> Result<Notification, PersistenceError>;
}
