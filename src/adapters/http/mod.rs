//! HTTP adapters - internal REST surface.
//!
//! The only HTTP endpoint besides the WebSocket upgrade is the internal
//! notify endpoint that domain event producers call after their own
//! mutations.

pub mod notify;

pub use notify::{notify_routes, NotifyRequest, NotifyResponse};
