//! Call signaling: a two-party offer/answer/end exchange relayed through
//! user rooms.
//!
//! The coordinator is a relay with a small amount of pair state:
//!
//! ```text
//! Idle ──callUser──▶ Ringing ──answerCall──▶ Connected
//!   ▲                   │                        │
//!   └────── endCall / disconnect / ring timeout ─┘
//! ```
//!
//! Ended is terminal for a pair and immediately resets it to Idle; nothing
//! about a call is persisted. Routing fields (`to`, `userToCall`) are
//! client-supplied and trusted as-is - hardening that trust boundary is a
//! known open item, deliberately not done here.
//!
//! A party can be in at most one pair. A `callUser` naming a party that is
//! already paired unlinks that party's old pair first (latest call wins),
//! and every link carries the sequence number of the call that created it,
//! so teardown paths and expiry timers never act across calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::adapters::websocket::{room_for, RoomRouter, ServerFrame};
use crate::domain::foundation::UserId;

/// Inbound `callUser` request, validated at the gateway.
#[derive(Debug, Clone)]
pub struct CallInvite {
    pub callee: UserId,
    pub signal: Value,
    pub caller: UserId,
    pub caller_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Ringing,
    Connected,
}

#[derive(Debug, Clone)]
struct PeerLink {
    peer: UserId,
    state: CallState,
    /// Identifies the call this link belongs to. Teardown paths and expiry
    /// timers only act on a link from their own call; a party that has
    /// since been claimed by a newer call is left alone.
    call_seq: u64,
}

/// Tunable coordinator behavior, set at wiring time.
#[derive(Debug, Clone)]
pub struct SignalingOptions {
    /// Expire calls that are never answered; both parties receive
    /// `callEnded` on expiry. `None` (the default) matches the original
    /// protocol, which lets a call ring forever.
    pub ring_timeout: Option<Duration>,

    /// Synthesize `callEnded` to the peer when a party's last session
    /// drops mid-call. `false` reproduces the original behavior of
    /// leaving the peer hanging.
    pub teardown_on_disconnect: bool,
}

impl Default for SignalingOptions {
    fn default() -> Self {
        Self {
            ring_timeout: None,
            teardown_on_disconnect: true,
        }
    }
}

struct Inner {
    router: Arc<RoomRouter>,
    /// Both parties of an active pair have an entry pointing at the other
    /// with the same `call_seq` (the reciprocity invariant).
    calls: RwLock<HashMap<UserId, PeerLink>>,
    next_call_seq: AtomicU64,
    options: SignalingOptions,
}

/// Removes the identity's link and, when it points back, the peer's
/// reverse link. Returns the removed link.
///
/// The reciprocity check matters: when the peer has since been claimed by
/// a newer call, its link belongs to that call and must survive.
fn unlink(calls: &mut HashMap<UserId, PeerLink>, identity: &UserId) -> Option<PeerLink> {
    let link = calls.remove(identity)?;
    if calls
        .get(&link.peer)
        .is_some_and(|reverse| reverse.call_seq == link.call_seq)
    {
        calls.remove(&link.peer);
    }
    Some(link)
}

/// Coordinates two-party call setup and teardown over the room router.
///
/// Cheap to clone; all clones share the pair table.
#[derive(Clone)]
pub struct SignalingCoordinator {
    inner: Arc<Inner>,
}

impl SignalingCoordinator {
    pub fn new(router: Arc<RoomRouter>) -> Self {
        Self::with_options(router, SignalingOptions::default())
    }

    pub fn with_options(router: Arc<RoomRouter>, options: SignalingOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                router,
                calls: RwLock::new(HashMap::new()),
                next_call_seq: AtomicU64::new(0),
                options,
            }),
        }
    }

    /// Idle → Ringing: relay the offer to the callee's room.
    ///
    /// Returns the delivery count. An offline callee yields 0; the caller
    /// is not informed of that in the current protocol.
    pub async fn call_user(&self, invite: CallInvite) -> usize {
        let CallInvite {
            callee,
            signal,
            caller,
            caller_name,
        } = invite;

        let delivered = self
            .inner
            .router
            .emit(
                &room_for(&callee),
                ServerFrame::CallUser {
                    signal,
                    from: caller.as_str().to_string(),
                    name: caller_name,
                },
            )
            .await;

        if delivered == 0 {
            tracing::debug!(callee = %callee, "callee offline, offer dropped");
        }

        // Latest call wins: a party already paired elsewhere is unlinked
        // first so its old peer's entry cannot go stale.
        let call_seq = self.inner.next_call_seq.fetch_add(1, Ordering::Relaxed);
        {
            let mut calls = self.inner.calls.write().await;
            unlink(&mut calls, &caller);
            unlink(&mut calls, &callee);
            calls.insert(
                caller.clone(),
                PeerLink {
                    peer: callee.clone(),
                    state: CallState::Ringing,
                    call_seq,
                },
            );
            calls.insert(
                callee.clone(),
                PeerLink {
                    peer: caller.clone(),
                    state: CallState::Ringing,
                    call_seq,
                },
            );
        }

        if let Some(timeout) = self.inner.options.ring_timeout {
            self.schedule_ring_expiry(caller, callee, call_seq, timeout);
        }

        delivered
    }

    /// Ringing → Connected: relay the answer to the caller's room.
    ///
    /// `to` is whatever the callee's client claims the caller is; no
    /// cross-check against the pair table (see module docs).
    pub async fn answer_call(&self, signal: Value, to: UserId) {
        self.inner
            .router
            .emit(&room_for(&to), ServerFrame::CallAccepted(signal))
            .await;

        let mut calls = self.inner.calls.write().await;
        if let Some(link) = calls.get_mut(&to) {
            link.state = CallState::Connected;
            let (peer, call_seq) = (link.peer.clone(), link.call_seq);
            if let Some(reverse) = calls.get_mut(&peer) {
                if reverse.call_seq == call_seq {
                    reverse.state = CallState::Connected;
                }
            }
        }
    }

    /// Any state → Ended: notify the peer and clear the pair.
    pub async fn end_call(&self, to: UserId) {
        self.inner
            .router
            .emit(&room_for(&to), ServerFrame::CallEnded {})
            .await;

        let mut calls = self.inner.calls.write().await;
        unlink(&mut calls, &to);
    }

    /// Called by the gateway when an identity's last live session dropped.
    ///
    /// If that identity was mid-call (Ringing or Connected), the peer gets
    /// a synthetic `callEnded` instead of being left hanging.
    pub async fn session_dropped(&self, identity: &UserId) {
        if !self.inner.options.teardown_on_disconnect {
            return;
        }

        let peer = {
            let mut calls = self.inner.calls.write().await;
            unlink(&mut calls, identity).map(|link| link.peer)
        };

        if let Some(peer) = peer {
            tracing::debug!(
                dropped = %identity,
                peer = %peer,
                "party disconnected mid-call, ending call"
            );
            self.inner
                .router
                .emit(&room_for(&peer), ServerFrame::CallEnded {})
                .await;
        }
    }

    /// Whether the identity currently has a pair entry (for tests and
    /// monitoring).
    pub async fn is_in_call(&self, identity: &UserId) -> bool {
        self.inner.calls.read().await.contains_key(identity)
    }

    fn schedule_ring_expiry(
        &self,
        caller: UserId,
        callee: UserId,
        call_seq: u64,
        timeout: Duration,
    ) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            // The seq check keeps a timer from an ended call from expiring
            // a newer call between the same two parties.
            let expired = {
                let mut calls = inner.calls.write().await;
                let still_ringing = calls.get(&caller).is_some_and(|l| {
                    l.call_seq == call_seq && l.state == CallState::Ringing
                });
                if still_ringing {
                    unlink(&mut calls, &caller);
                }
                still_ringing
            };

            if expired {
                tracing::debug!(caller = %caller, callee = %callee, "ring timeout, ending call");
                inner
                    .router
                    .emit(&room_for(&caller), ServerFrame::CallEnded {})
                    .await;
                inner
                    .router
                    .emit(&room_for(&callee), ServerFrame::CallEnded {})
                    .await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::{SessionHandle, SessionRegistry};
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    struct Fixture {
        registry: Arc<SessionRegistry>,
        coordinator: SignalingCoordinator,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(SessionRegistry::new());
            let router = Arc::new(RoomRouter::new(Arc::clone(&registry)));
            Self {
                registry,
                coordinator: SignalingCoordinator::new(router),
            }
        }

        async fn connect(&self, identity: &UserId) -> (crate::domain::foundation::SessionId, UnboundedReceiver<ServerFrame>) {
            let (handle, rx) = SessionHandle::new();
            let id = handle.id();
            self.registry.register(handle).await.unwrap();
            self.registry.bind(id, identity.clone()).await.unwrap();
            (id, rx)
        }
    }

    fn invite(caller: &UserId, callee: &UserId, signal: Value) -> CallInvite {
        CallInvite {
            callee: callee.clone(),
            signal,
            caller: caller.clone(),
            caller_name: "Alice".to_string(),
        }
    }

    #[tokio::test]
    async fn full_call_exchange_relays_all_three_frames() {
        let fx = Fixture::new();
        let (alice, bob) = (user("alice"), user("bob"));
        let (_a, mut alice_rx) = fx.connect(&alice).await;
        let (_b, mut bob_rx) = fx.connect(&bob).await;

        // callUser: bob's transport rings.
        let delivered = fx
            .coordinator
            .call_user(invite(&alice, &bob, json!("S1")))
            .await;
        assert_eq!(delivered, 1);
        assert_eq!(
            bob_rx.recv().await.unwrap(),
            ServerFrame::CallUser {
                signal: json!("S1"),
                from: "alice".to_string(),
                name: "Alice".to_string(),
            }
        );

        // answerCall: alice's transport gets the bare blob.
        fx.coordinator.answer_call(json!("S2"), alice.clone()).await;
        assert_eq!(
            alice_rx.recv().await.unwrap(),
            ServerFrame::CallAccepted(json!("S2"))
        );
        assert!(fx.coordinator.is_in_call(&alice).await);

        // endCall: bob's transport is told, pair resets to idle.
        fx.coordinator.end_call(bob.clone()).await;
        assert_eq!(bob_rx.recv().await.unwrap(), ServerFrame::CallEnded {});
        assert!(!fx.coordinator.is_in_call(&alice).await);
        assert!(!fx.coordinator.is_in_call(&bob).await);
    }

    #[tokio::test]
    async fn offline_callee_yields_zero_without_error() {
        let fx = Fixture::new();
        let (alice, bob) = (user("alice"), user("bob"));
        let (_a, _alice_rx) = fx.connect(&alice).await;

        let delivered = fx
            .coordinator
            .call_user(invite(&alice, &bob, json!("S1")))
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn disconnect_of_last_session_ends_the_call() {
        let fx = Fixture::new();
        let (alice, bob) = (user("alice"), user("bob"));
        let (_a, mut alice_rx) = fx.connect(&alice).await;
        let (_b, _bob_rx) = fx.connect(&bob).await;

        fx.coordinator
            .call_user(invite(&alice, &bob, json!("S1")))
            .await;
        fx.coordinator.answer_call(json!("S2"), alice.clone()).await;
        let _ = alice_rx.recv().await; // drain callAccepted

        fx.coordinator.session_dropped(&bob).await;

        assert_eq!(alice_rx.recv().await.unwrap(), ServerFrame::CallEnded {});
        assert!(!fx.coordinator.is_in_call(&alice).await);
    }

    #[tokio::test]
    async fn call_to_a_busy_party_replaces_its_pair_cleanly() {
        let fx = Fixture::new();
        let (alice, bob, mallory) = (user("alice"), user("bob"), user("mallory"));
        let (_a, mut alice_rx) = fx.connect(&alice).await;
        let (_b, mut bob_rx) = fx.connect(&bob).await;
        let (_m, _mallory_rx) = fx.connect(&mallory).await;

        // alice and bob reach Connected.
        fx.coordinator
            .call_user(invite(&alice, &bob, json!("S1")))
            .await;
        fx.coordinator.answer_call(json!("S2"), alice.clone()).await;
        let _ = bob_rx.recv().await; // callUser
        let _ = alice_rx.recv().await; // callAccepted

        // mallory claims bob; the alice-bob pair is fully unlinked.
        fx.coordinator
            .call_user(invite(&mallory, &bob, json!("S3")))
            .await;
        let _ = bob_rx.recv().await; // callUser from mallory
        assert!(!fx.coordinator.is_in_call(&alice).await);

        // alice dropping now must not touch the bob-mallory pair and must
        // not send bob a callEnded for a call he is no longer in.
        fx.coordinator.session_dropped(&alice).await;

        assert!(fx.coordinator.is_in_call(&bob).await);
        assert!(fx.coordinator.is_in_call(&mallory).await);
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn expiry_timer_from_an_ended_call_ignores_the_next_call() {
        let registry = Arc::new(SessionRegistry::new());
        let router = Arc::new(RoomRouter::new(Arc::clone(&registry)));
        let coordinator = SignalingCoordinator::with_options(
            router,
            SignalingOptions {
                ring_timeout: Some(Duration::from_millis(50)),
                ..SignalingOptions::default()
            },
        );
        let (alice, bob) = (user("alice"), user("bob"));

        // First call ends immediately, leaving its timer pending.
        coordinator.call_user(invite(&alice, &bob, json!("S1"))).await;
        coordinator.end_call(bob.clone()).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        coordinator.call_user(invite(&alice, &bob, json!("S2"))).await;

        // The first call's timer has fired by now; the second call must
        // still be ringing.
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(coordinator.is_in_call(&alice).await);

        // The second call's own timer expires it eventually.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!coordinator.is_in_call(&alice).await);
    }

    #[tokio::test]
    async fn disconnect_teardown_can_be_disabled() {
        let registry = Arc::new(SessionRegistry::new());
        let router = Arc::new(RoomRouter::new(Arc::clone(&registry)));
        let coordinator = SignalingCoordinator::with_options(
            router,
            SignalingOptions {
                teardown_on_disconnect: false,
                ..SignalingOptions::default()
            },
        );
        let (alice, bob) = (user("alice"), user("bob"));

        coordinator.call_user(invite(&alice, &bob, json!("S1"))).await;
        coordinator.session_dropped(&bob).await;

        // Pair survives, matching the original protocol.
        assert!(coordinator.is_in_call(&alice).await);
    }

    #[tokio::test]
    async fn unanswered_call_expires_when_timeout_configured() {
        let registry = Arc::new(SessionRegistry::new());
        let router = Arc::new(RoomRouter::new(Arc::clone(&registry)));
        let coordinator = SignalingCoordinator::with_options(
            router,
            SignalingOptions {
                ring_timeout: Some(Duration::from_millis(20)),
                ..SignalingOptions::default()
            },
        );
        let (alice, bob) = (user("alice"), user("bob"));

        let (h_a, mut alice_rx) = SessionHandle::new();
        let id_a = h_a.id();
        registry.register(h_a).await.unwrap();
        registry.bind(id_a, alice.clone()).await.unwrap();

        coordinator.call_user(invite(&alice, &bob, json!("S1"))).await;
        assert!(coordinator.is_in_call(&alice).await);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(!coordinator.is_in_call(&alice).await);
        assert_eq!(alice_rx.recv().await.unwrap(), ServerFrame::CallEnded {});
    }

    #[tokio::test]
    async fn answered_call_is_not_expired_by_the_timer() {
        let registry = Arc::new(SessionRegistry::new());
        let router = Arc::new(RoomRouter::new(Arc::clone(&registry)));
        let coordinator = SignalingCoordinator::with_options(
            router,
            SignalingOptions {
                ring_timeout: Some(Duration::from_millis(20)),
                ..SignalingOptions::default()
            },
        );
        let (alice, bob) = (user("alice"), user("bob"));

        coordinator.call_user(invite(&alice, &bob, json!("S1"))).await;
        coordinator.answer_call(json!("S2"), alice.clone()).await;

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(coordinator.is_in_call(&alice).await);
        assert!(coordinator.is_in_call(&bob).await);
    }
}
