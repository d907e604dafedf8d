//! Lumina Realtime - Notification and presence fan-out subsystem
//!
//! This crate implements the real-time layer of the Lumina social backend:
//! per-user delivery rooms over WebSocket sessions, durably persisted
//! notifications with best-effort push, and two-party call signaling.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
