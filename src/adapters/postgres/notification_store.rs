//! PostgreSQL implementation of NotificationStore.
//!
//! Persists notification records to PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::notification::{NewNotification, Notification};
use crate::ports::{NotificationStore, PersistenceError};

/// PostgreSQL implementation of NotificationStore.
#[derive(Clone)]
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    /// Creates a new PostgresNotificationStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn create(&self, notification: NewNotification) -> Result<Notification, PersistenceError> {
        let record = Notification::from_new(notification);

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, recipient_id, kind, message, related_entity_id, is_read, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.recipient.as_str())
        .bind(record.kind.as_str())
        .bind(&record.message)
        .bind(record.related_entity_id.as_deref())
        .bind(record.is_read)
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(record)
    }
}

fn map_sqlx_error(e: sqlx::Error) -> PersistenceError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PersistenceError::Unavailable(format!("database unreachable: {}", e))
        }
        other => PersistenceError::WriteFailed(format!("failed to insert notification: {}", other)),
    }
}
