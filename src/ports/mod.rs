//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! this subsystem and its collaborators. Adapters implement these ports.
//!
//! The realtime subsystem consumes exactly one durable collaborator: the
//! notification store. Authentication happens upstream (the `join` frame
//! carries an already-verified identity) and domain event producers call
//! [`NotificationService`](crate::application::NotificationService) directly,
//! so neither needs a port here.

mod notification_store;

pub use notification_store::{NotificationStore, PersistenceError};
