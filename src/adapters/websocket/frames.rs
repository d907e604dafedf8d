//! Wire protocol frames for the realtime connection.
//!
//! Every frame is a JSON envelope `{"event": ..., "data": ...}`, one tagged
//! union per direction. Inbound frames are validated here, at the transport
//! boundary, before anything is dispatched - untyped payloads never cross
//! into the routing layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{NotificationId, SessionId};
use crate::domain::notification::NotificationKind;

// ============================================
// Client → Server Frames
// ============================================

/// All frame types a connected client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Bind this session to a user identity and thereby join that user's
    /// room. The identity arrives pre-authenticated from upstream.
    #[serde(rename_all = "camelCase")]
    Join { user_identity: String },

    /// Start a call: relay an offer blob to the callee's room.
    #[serde(rename_all = "camelCase")]
    CallUser {
        user_to_call: String,
        signal_data: Value,
        from: String,
        name: String,
    },

    /// Accept a call: relay the answer blob back to the caller's room.
    #[serde(rename_all = "camelCase")]
    AnswerCall { signal: Value, to: String },

    /// Terminate a call, naming the peer to notify.
    #[serde(rename_all = "camelCase")]
    EndCall { to: String },
}

// ============================================
// Server → Client Frames
// ============================================

/// All frame types the server may push to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerFrame {
    /// Connection accepted; carries the assigned session id.
    #[serde(rename_all = "camelCase")]
    Connected {
        session_id: SessionId,
        timestamp: String,
    },

    /// A notification was durably recorded for this user.
    #[serde(rename_all = "camelCase")]
    NewNotification {
        message: String,
        kind: NotificationKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        related_entity_id: Option<String>,
        notification_id: NotificationId,
    },

    /// Incoming call: the caller's offer blob.
    #[serde(rename_all = "camelCase")]
    CallUser {
        signal: Value,
        from: String,
        name: String,
    },

    /// The callee accepted; payload is the bare answer blob.
    CallAccepted(Value),

    /// The peer ended the call.
    CallEnded {},

    /// A frame could not be processed; the connection stays open.
    #[serde(rename_all = "camelCase")]
    Error { code: String, message: String },
}
