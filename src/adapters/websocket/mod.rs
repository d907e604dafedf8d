//! WebSocket adapter for the realtime fan-out surface.
//!
//! This module owns the transport edge: session bookkeeping, room-based
//! fan-out, the wire protocol, and the axum upgrade handler.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Application services                         │
//! │   NotificationService (persist + push)  SignalingCoordinator    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//!                                  │ emit(room, frame)
//!                                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         RoomRouter                               │
//! │   room "alice" ──▶ live sessions of alice (all devices)         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//!                                  │ resolves via
//!                                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       SessionRegistry                            │
//! │   SessionId ──▶ SessionHandle (outbound queue) + bound UserId   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//!                                  │ drained by
//!                                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              handler (axum upgrade + socket pumps)               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`frames`] - wire protocol frame types
//! - [`registry`] - live-session bookkeeping
//! - [`router`] - room resolution and fan-out
//! - [`handler`] - axum WebSocket upgrade handler

pub mod frames;
pub mod handler;
pub mod registry;
pub mod router;

pub use frames::{ClientFrame, ServerFrame};
pub use handler::{realtime_router, ws_handler, RealtimeState};
pub use registry::{RegistryError, SessionHandle, SessionRegistry};
pub use router::{room_for, RoomName, RoomRouter};
