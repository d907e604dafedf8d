//! Adapters - implementations of ports plus the transport edges.
//!
//! - [`websocket`] - the realtime surface (sessions, rooms, frames, upgrade)
//! - [`http`] - the internal notify endpoint
//! - [`postgres`] - durable notification persistence
//! - [`memory`] - in-memory persistence for tests

pub mod http;
pub mod memory;
pub mod postgres;
pub mod websocket;
