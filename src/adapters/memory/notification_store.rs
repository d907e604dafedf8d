//! In-memory notification store for testing.
//!
//! Provides synchronous, deterministic persistence for unit and
//! integration tests, plus a switch to simulate a failing store.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic if
//! locks are poisoned. Production code should use the Postgres adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::notification::{NewNotification, Notification};
use crate::ports::{NotificationStore, PersistenceError};

/// In-memory notification store for testing.
///
/// Features:
/// - Record capture for assertions
/// - Failure injection via [`fail_writes`](Self::fail_writes)
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    records: RwLock<Vec<Notification>>,
    failing: AtomicBool,
}

impl InMemoryNotificationStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Makes every subsequent write fail (or succeed again) on demand.
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns all stored records (for test assertions).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn records(&self) -> Vec<Notification> {
        self.records
            .read()
            .expect("InMemoryNotificationStore: records lock poisoned")
            .clone()
    }

    /// Returns count of stored records.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn created_count(&self) -> usize {
        self.records
            .read()
            .expect("InMemoryNotificationStore: records lock poisoned")
            .len()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, notification: NewNotification) -> Result<Notification, PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::WriteFailed(
                "injected write failure".to_string(),
            ));
        }

        let record = Notification::from_new(notification);
        self.records
            .write()
            .expect("InMemoryNotificationStore: records write lock poisoned")
            .push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::notification::NotificationKind;

    fn request() -> NewNotification {
        NewNotification::new(
            UserId::new("alice").unwrap(),
            NotificationKind::Like,
            "X liked your post",
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_stores_an_unread_record() {
        let store = InMemoryNotificationStore::new();
        let record = store.create(request()).await.unwrap();

        assert!(!record.is_read);
        assert_eq!(store.created_count(), 1);
        assert_eq!(store.records()[0].id, record.id);
    }

    #[tokio::test]
    async fn failure_injection_rejects_writes() {
        let store = InMemoryNotificationStore::new();
        store.fail_writes(true);

        let result = store.create(request()).await;
        assert!(matches!(result, Err(PersistenceError::WriteFailed(_))));
        assert_eq!(store.created_count(), 0);

        store.fail_writes(false);
        store.create(request()).await.unwrap();
        assert_eq!(store.created_count(), 1);
    }
}
