//! Notification model.
//!
//! The durable record is the source of truth: it is created through the
//! [`NotificationStore`](crate::ports::NotificationStore) port before any
//! real-time push is attempted, and it remains available for later retrieval
//! whether or not the recipient was online. The push itself is advisory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::foundation::{NotificationId, Timestamp, UserId, ValidationError};

/// Category of a notification, carried on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Someone liked the recipient's post.
    Like,
    /// Someone commented on the recipient's post.
    Comment,
    /// Someone prayed for the recipient's prayer request.
    Prayer,
    /// Someone followed the recipient.
    Follow,
    /// Anything a future producer may send that has no dedicated kind.
    Other,
}

impl NotificationKind {
    /// Storage representation, also the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Prayer => "prayer",
            NotificationKind::Follow => "follow",
            NotificationKind::Other => "other",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(NotificationKind::Like),
            "comment" => Ok(NotificationKind::Comment),
            "prayer" => Ok(NotificationKind::Prayer),
            "follow" => Ok(NotificationKind::Follow),
            "other" => Ok(NotificationKind::Other),
            _ => Err(ValidationError::invalid_format(
                "kind",
                format!("unknown notification kind '{}'", s),
            )),
        }
    }
}

/// Validated request to create a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub message: String,
    /// ID of the related post/prayer/event, if any.
    pub related_entity_id: Option<String>,
}

impl NewNotification {
    /// Builds a creation request, rejecting empty message text.
    pub fn new(
        recipient: UserId,
        kind: NotificationKind,
        message: impl Into<String>,
        related_entity_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ValidationError::empty_field("message"));
        }
        Ok(Self {
            recipient,
            kind,
            message,
            related_entity_id,
        })
    }
}

/// The durable notification record, as returned by the store.
///
/// `is_read` is mutated by collaborators outside this subsystem; it is
/// carried here only so the record round-trips intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub related_entity_id: Option<String>,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    /// Materializes a fresh, unread record from a creation request.
    pub fn from_new(new: NewNotification) -> Self {
        Self {
            id: NotificationId::new(),
            recipient: new.recipient,
            kind: new.kind,
            message: new.message,
            related_entity_id: new.related_entity_id,
            is_read: false,
            created_at: Timestamp::now(),
        }
    }
}
