//! Session registry: the authoritative map from user identity to live
//! transport sessions.
//!
//! A session is created anonymous on connect and only becomes routable once
//! a `join` frame binds it to an identity. A user may hold any number of
//! sessions at once (tabs, devices); all of them are tracked here and
//! nowhere else.
//!
//! # Thread Safety
//!
//! All mutation goes through a single `RwLock` over both internal maps, so
//! concurrent connect/join/disconnect races (two tabs opening while one
//! closes) cannot lose updates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::domain::foundation::{SessionId, Timestamp, UserId};

use super::frames::ServerFrame;

/// Errors surfaced by registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A session id collided on register. This indicates a broken internal
    /// invariant; the connection attempt must be abandoned.
    #[error("session {0} is already registered")]
    DuplicateSession(SessionId),

    /// A frame referenced a session that is no longer (or never was)
    /// registered. Expected when frames race with teardown; logged and
    /// dropped, never surfaced to a peer.
    #[error("session {0} is not registered")]
    UnknownSession(SessionId),
}

/// One live transport session.
///
/// The handle owns the outbound leg of the connection: a channel drained by
/// the gateway's send task, which is the only writer to the underlying
/// socket. Pushing converts any transport fault into `false`.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    connected_at: Timestamp,
    outbound: mpsc::UnboundedSender<ServerFrame>,
}

impl SessionHandle {
    /// Creates a handle plus the receiver the gateway drains into the
    /// socket.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Arc::new(Self {
            id: SessionId::new(),
            connected_at: Timestamp::now(),
            outbound: tx,
        });
        (handle, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    /// Best-effort push of one frame to this session.
    ///
    /// Returns `false` when the outbound channel is closed (the connection
    /// is gone or going); the frame is dropped, never an error.
    pub fn push(&self, frame: ServerFrame) -> bool {
        self.outbound.send(frame).is_ok()
    }
}

struct SessionEntry {
    handle: Arc<SessionHandle>,
    identity: Option<UserId>,
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<SessionId, SessionEntry>,
    by_identity: HashMap<UserId, HashSet<SessionId>>,
}

/// Registry of live sessions, keyed both ways: by session id and by the
/// identity a session is bound to.
#[derive(Default)]
pub struct SessionRegistry {
    inner: RwLock<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly connected, still-anonymous session.
    pub async fn register(&self, handle: Arc<SessionHandle>) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        let id = handle.id();
        if inner.sessions.contains_key(&id) {
            return Err(RegistryError::DuplicateSession(id));
        }
        inner.sessions.insert(
            id,
            SessionEntry {
                handle,
                identity: None,
            },
        );
        Ok(())
    }

    /// Binds a session to an identity (the `join` operation).
    ///
    /// Rebinding to a different identity replaces the previous binding and
    /// removes the session from the old identity's set.
    pub async fn bind(&self, session_id: SessionId, identity: UserId) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;

        let previous = match inner.sessions.get_mut(&session_id) {
            Some(entry) => entry.identity.replace(identity.clone()),
            None => return Err(RegistryError::UnknownSession(session_id)),
        };

        if let Some(old) = previous {
            if old != identity {
                Self::drop_from_identity(&mut inner.by_identity, &old, session_id);
            }
        }

        inner
            .by_identity
            .entry(identity)
            .or_default()
            .insert(session_id);
        Ok(())
    }

    /// Removes a session. No-op if already gone - disconnects may race with
    /// natural teardown.
    pub async fn unregister(&self, session_id: SessionId) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.sessions.remove(&session_id) {
            if let Some(identity) = entry.identity {
                Self::drop_from_identity(&mut inner.by_identity, &identity, session_id);
            }
        }
    }

    /// Immutable snapshot of the identity's live sessions (may be empty).
    pub async fn live_sessions_for(&self, identity: &UserId) -> Vec<Arc<SessionHandle>> {
        let inner = self.inner.read().await;
        inner
            .by_identity
            .get(identity)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.sessions.get(id))
                    .map(|entry| Arc::clone(&entry.handle))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True iff the identity has at least one live session.
    pub async fn is_online(&self, identity: &UserId) -> bool {
        let inner = self.inner.read().await;
        inner
            .by_identity
            .get(identity)
            .is_some_and(|ids| !ids.is_empty())
    }

    /// The identity a session is currently bound to, if any.
    pub async fn identity_of(&self, session_id: SessionId) -> Option<UserId> {
        let inner = self.inner.read().await;
        inner
            .sessions
            .get(&session_id)
            .and_then(|entry| entry.identity.clone())
    }

    /// Total live session count, bound or not (for monitoring).
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    fn drop_from_identity(
        by_identity: &mut HashMap<UserId, HashSet<SessionId>>,
        identity: &UserId,
        session_id: SessionId,
    ) {
        if let Some(ids) = by_identity.get_mut(identity) {
            ids.remove(&session_id);
            if ids.is_empty() {
                by_identity.remove(identity);
            }
        }
    }
}
