//! WebSocket upgrade handler for real-time client connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Upgrade to WebSocket and register the session
//! 2. Confirm the session to the client (`connected`)
//! 3. Relay frames both ways until disconnect
//! 4. Unregister and, if this was the identity's last session, tear down
//!    any call it was party to

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use crate::application::{CallInvite, SignalingCoordinator};
use crate::domain::foundation::{SessionId, UserId};

use super::{
    frames::{ClientFrame, ServerFrame},
    registry::{SessionHandle, SessionRegistry},
    router::RoomRouter,
};

/// State required for WebSocket handling.
///
/// Extracted from the application state.
#[derive(Clone)]
pub struct RealtimeState {
    pub registry: Arc<SessionRegistry>,
    pub router: Arc<RoomRouter>,
    pub signaling: SignalingCoordinator,
}

impl RealtimeState {
    pub fn new(
        registry: Arc<SessionRegistry>,
        router: Arc<RoomRouter>,
        signaling: SignalingCoordinator,
    ) -> Self {
        Self {
            registry,
            router,
            signaling,
        }
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /realtime`
///
/// # Security
///
/// Currently performs no authentication; the identity a client binds via
/// `join` and the routing fields on signaling frames are taken at face
/// value. Production should authenticate the upgrade and derive the
/// identity server-side.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<RealtimeState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
///
/// Runs for the lifetime of the connection: registers the session, pumps
/// outbound frames from the session's queue to the socket, dispatches
/// inbound frames, and cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: RealtimeState) {
    let (mut sender, mut receiver) = socket.split();

    let (handle, mut outbound_rx) = SessionHandle::new();
    let session_id = handle.id();
    let connected_at = handle.connected_at();

    if let Err(e) = state.registry.register(Arc::clone(&handle)).await {
        tracing::error!(session_id = %session_id, "session registration failed: {}", e);
        return;
    }
    tracing::debug!(session_id = %session_id, "session connected");

    // Queued before the pump starts, so it is the first frame on the wire.
    handle.push(ServerFrame::Connected {
        session_id,
        timestamp: connected_at.to_rfc3339(),
    });

    // Outbound pump: drain the session queue onto the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = send_frame(&mut sender, &frame).await {
                tracing::debug!(
                    session_id = %session_id,
                    "send error, closing connection: {}",
                    e
                );
                break;
            }
        }
    });

    // Inbound pump: parse and dispatch client frames.
    let recv_state = state.clone();
    let recv_handle = Arc::clone(&handle);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => dispatch(frame, session_id, &recv_state, &recv_handle).await,
                    Err(e) => {
                        tracing::debug!(
                            session_id = %session_id,
                            "unparseable frame: {}",
                            e
                        );
                        recv_handle.push(ServerFrame::Error {
                            code: "BAD_FRAME".to_string(),
                            message: "frame could not be parsed".to_string(),
                        });
                    }
                },
                Ok(Message::Binary(_)) => {
                    tracing::warn!(
                        session_id = %session_id,
                        "received unsupported binary message"
                    );
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level keepalive, handled by axum.
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(session_id = %session_id, "client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(session_id = %session_id, "receive error: {}", e);
                    break;
                }
            }
        }
    });

    // Whichever pump finishes first takes the other down with it.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Cleanup: capture the bound identity before the registry forgets it,
    // then end any call the identity was in if no other device remains.
    let identity = state.registry.identity_of(session_id).await;
    state.registry.unregister(session_id).await;
    tracing::debug!(session_id = %session_id, "session disconnected");

    if let Some(identity) = identity {
        if !state.registry.is_online(&identity).await {
            state.signaling.session_dropped(&identity).await;
        }
    }
}

/// Route one parsed client frame to the owning component.
async fn dispatch(
    frame: ClientFrame,
    session_id: SessionId,
    state: &RealtimeState,
    handle: &Arc<SessionHandle>,
) {
    match frame {
        ClientFrame::Join { user_identity } => match UserId::new(user_identity) {
            Ok(identity) => {
                if let Err(e) = state.router.join(session_id, identity).await {
                    // Session raced its own disconnect; nothing to do.
                    tracing::warn!(session_id = %session_id, "join failed: {}", e);
                }
            }
            Err(e) => {
                handle.push(ServerFrame::Error {
                    code: "INVALID_IDENTITY".to_string(),
                    message: e.to_string(),
                });
            }
        },
        ClientFrame::CallUser {
            user_to_call,
            signal_data,
            from,
            name,
        } => {
            let (callee, caller) = match (UserId::new(user_to_call), UserId::new(from)) {
                (Ok(callee), Ok(caller)) => (callee, caller),
                _ => {
                    handle.push(ServerFrame::Error {
                        code: "INVALID_IDENTITY".to_string(),
                        message: "call parties must be non-empty identities".to_string(),
                    });
                    return;
                }
            };
            state
                .signaling
                .call_user(CallInvite {
                    callee,
                    signal: signal_data,
                    caller,
                    caller_name: name,
                })
                .await;
        }
        ClientFrame::AnswerCall { signal, to } => match UserId::new(to) {
            Ok(to) => state.signaling.answer_call(signal, to).await,
            Err(e) => {
                handle.push(ServerFrame::Error {
                    code: "INVALID_IDENTITY".to_string(),
                    message: e.to_string(),
                });
            }
        },
        ClientFrame::EndCall { to } => match UserId::new(to) {
            Ok(to) => state.signaling.end_call(to).await,
            Err(e) => {
                handle.push(ServerFrame::Error {
                    code: "INVALID_IDENTITY".to_string(),
                    message: e.to_string(),
                });
            }
        },
    }
}

/// Send a JSON frame over the WebSocket.
async fn send_frame(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    match serde_json::to_string(frame) {
        Ok(json) => sender.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!("frame serialization failed: {}", e);
            Ok(())
        }
    }
}

/// Create axum router for the WebSocket endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(realtime_router())
///     .with_state(realtime_state);
/// ```
pub fn realtime_router() -> axum::Router<RealtimeState> {
    use axum::routing::get;

    axum::Router::new().route("/realtime", get(ws_handler))
}
