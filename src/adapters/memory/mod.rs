//! In-memory adapters for tests and local development.

mod notification_store;

pub use notification_store::InMemoryNotificationStore;
