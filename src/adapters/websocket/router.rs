//! Room-based routing: resolve a room name to live sessions and fan out.
//!
//! Rooms are delivery groups. In the current protocol every room is 1:1
//! with a user identity ("join your own room"); that convention lives in
//! exactly one place, [`room_for`], so future non-1:1 schemes only have to
//! change the mapping and the router's resolution step.

use std::fmt;
use std::sync::Arc;

use crate::domain::foundation::{SessionId, UserId, ValidationError};

use super::frames::ServerFrame;
use super::registry::{RegistryError, SessionRegistry};

/// Name of a delivery room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomName(String);

impl RoomName {
    /// The room a user's devices join.
    pub fn for_user(identity: &UserId) -> Self {
        Self(identity.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the room back to the identity it denotes.
    ///
    /// Valid as long as rooms stay 1:1 with identities; the router is the
    /// only caller.
    fn as_identity(&self) -> Result<UserId, ValidationError> {
        UserId::new(self.0.clone())
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a user identity to the room that user's sessions join.
pub fn room_for(identity: &UserId) -> RoomName {
    RoomName::for_user(identity)
}

/// Resolves rooms against the session registry and fans frames out to every
/// live member session.
pub struct RoomRouter {
    registry: Arc<SessionRegistry>,
}

impl RoomRouter {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Puts a session into a user's room by binding it to that identity.
    pub async fn join(
        &self,
        session_id: SessionId,
        identity: UserId,
    ) -> Result<(), RegistryError> {
        self.registry.bind(session_id, identity).await
    }

    /// Pushes a frame to every live session in the room.
    ///
    /// Returns the number of sessions the frame reached. Zero means the
    /// recipient is offline - the expected case, not an error. A push
    /// failure on one session (half-closed transport) is logged and does
    /// not stop delivery to the rest; partial delivery is acceptable.
    pub async fn emit(&self, room: &RoomName, frame: ServerFrame) -> usize {
        let identity = match room.as_identity() {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(room = %room, "unroutable room name: {}", e);
                return 0;
            }
        };

        let sessions = self.registry.live_sessions_for(&identity).await;
        if sessions.is_empty() {
            tracing::debug!(room = %room, "no live sessions, push skipped");
            return 0;
        }

        let mut delivered = 0;
        for session in sessions {
            if session.push(frame.clone()) {
                delivered += 1;
            } else {
                tracing::warn!(
                    room = %room,
                    session_id = %session.id(),
                    "push failed, transport gone"
                );
            }
        }
        delivered
    }
}
