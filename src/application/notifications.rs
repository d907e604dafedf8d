//! Notification service: the persisted-then-pushed dual write.
//!
//! Domain event producers (post/prayer/event/community handlers elsewhere in
//! the backend) call [`NotificationService::notify`] after completing their
//! own mutation. The contract:
//!
//! 1. The notification is durably created first. If that fails, the call
//!    fails and no push happens - a client must never see a real-time alert
//!    for a record that might vanish on reload.
//! 2. Only then is a best-effort push emitted to the recipient's room. The
//!    push outcome never rolls back the record and never fails the call;
//!    an offline recipient simply reads the record later.

use std::sync::Arc;

use crate::adapters::websocket::{room_for, RoomRouter, ServerFrame};
use crate::domain::foundation::{UserId, ValidationError};
use crate::domain::notification::{NewNotification, Notification, NotificationKind};
use crate::ports::{NotificationStore, PersistenceError};

/// Errors a notify caller can observe.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The request was malformed (empty message, bad identity).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The durable write failed; nothing was pushed and the caller's own
    /// operation should be failed or flagged.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result of a successful notify: the durable record plus the advisory
/// count of sessions the push reached (0 = recipient offline).
#[derive(Debug)]
pub struct NotifyOutcome {
    pub notification: Notification,
    pub delivered: usize,
}

/// Orchestrates the durable write and the room push.
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    router: Arc<RoomRouter>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>, router: Arc<RoomRouter>) -> Self {
        Self { store, router }
    }

    /// Records a notification and pushes it to the recipient's room.
    pub async fn notify(
        &self,
        recipient: UserId,
        kind: NotificationKind,
        message: impl Into<String>,
        related_entity_id: Option<String>,
    ) -> Result<NotifyOutcome, NotifyError> {
        let request = NewNotification::new(recipient, kind, message, related_entity_id)?;

        // Step 1: durable record. Failure propagates, push never happens.
        let notification = self.store.create(request).await.map_err(|e| {
            tracing::error!("notification persistence failed: {}", e);
            e
        })?;

        // Step 2: advisory push. Delivery count is informational only.
        let frame = ServerFrame::NewNotification {
            message: notification.message.clone(),
            kind: notification.kind,
            related_entity_id: notification.related_entity_id.clone(),
            notification_id: notification.id,
        };
        let delivered = self
            .router
            .emit(&room_for(&notification.recipient), frame)
            .await;

        tracing::debug!(
            recipient = %notification.recipient,
            kind = %notification.kind,
            delivered,
            "notification recorded and pushed"
        );

        Ok(NotifyOutcome {
            notification,
            delivered,
        })
    }
}
