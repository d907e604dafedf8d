//! PostgreSQL adapters - database implementations for persistence ports.

mod notification_store;

pub use notification_store::PostgresNotificationStore;
