//! Internal notify endpoint.
//!
//! Domain event producers (post, comment, follow handlers elsewhere in the
//! backend) POST here after completing their own mutation; the service
//! persists the notification and pushes it to the recipient's room.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::application::{NotificationService, NotifyError};
use crate::domain::foundation::UserId;
use crate::domain::notification::NotificationKind;
use crate::ports::PersistenceError;

// ════════════════════════════════════════════════════════════════════════════
// DTOs
// ════════════════════════════════════════════════════════════════════════════

/// POST /internal/notify request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub recipient: String,
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub related_entity_id: Option<String>,
}

/// Successful notify response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyResponse {
    pub notification_id: String,
    /// Sessions the realtime push reached; 0 means the recipient was
    /// offline and will see the record on next load.
    pub delivered: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// ════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /internal/notify - record a notification and push it.
async fn create_notification(
    State(service): State<Arc<NotificationService>>,
    Json(req): Json<NotifyRequest>,
) -> Response {
    let recipient = match UserId::new(req.recipient) {
        Ok(recipient) => recipient,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    match service
        .notify(recipient, req.kind, req.message, req.related_entity_id)
        .await
    {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(NotifyResponse {
                notification_id: outcome.notification.id.to_string(),
                delivered: outcome.delivered,
            }),
        )
            .into_response(),
        Err(e) => handle_notify_error(e),
    }
}

fn handle_notify_error(e: NotifyError) -> Response {
    match e {
        NotifyError::Validation(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
        NotifyError::Persistence(PersistenceError::Unavailable(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "notification store unavailable".to_string(),
            }),
        )
            .into_response(),
        NotifyError::Persistence(PersistenceError::WriteFailed(_)) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: "notification could not be recorded".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Creates the notify router.
pub fn notify_routes(service: Arc<NotificationService>) -> Router {
    Router::new()
        .route("/notify", post(create_notification))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryNotificationStore;
    use crate::adapters::websocket::{RoomRouter, SessionRegistry};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn service(store: Arc<InMemoryNotificationStore>) -> Arc<NotificationService> {
        let registry = Arc::new(SessionRegistry::new());
        let router = Arc::new(RoomRouter::new(registry));
        Arc::new(NotificationService::new(store, router))
    }

    fn post_notify(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/notify")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn notify_route_records_and_returns_created() {
        let store = Arc::new(InMemoryNotificationStore::new());
        let app = notify_routes(service(Arc::clone(&store)));

        let response = app
            .oneshot(post_notify(
                r#"{"recipient": "carol", "kind": "like", "message": "X liked your post"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(store.created_count(), 1);
    }

    #[tokio::test]
    async fn notify_route_rejects_blank_recipient() {
        let store = Arc::new(InMemoryNotificationStore::new());
        let app = notify_routes(service(Arc::clone(&store)));

        let response = app
            .oneshot(post_notify(
                r#"{"recipient": "", "kind": "like", "message": "hi"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.created_count(), 0);
    }

    #[tokio::test]
    async fn notify_route_reports_failed_persistence() {
        let store = Arc::new(InMemoryNotificationStore::new());
        store.fail_writes(true);
        let app = notify_routes(service(Arc::clone(&store)));

        let response = app
            .oneshot(post_notify(
                r#"{"recipient": "carol", "kind": "like", "message": "hi"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn notify_request_deserializes_camel_case() {
        let raw = r#"{
            "recipient": "carol",
            "kind": "comment",
            "message": "Bob commented on your post",
            "relatedEntityId": "post123"
        }"#;
        let req: NotifyRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.recipient, "carol");
        assert_eq!(req.kind, NotificationKind::Comment);
        assert_eq!(req.related_entity_id.as_deref(), Some("post123"));
    }

    #[test]
    fn related_entity_id_defaults_to_none() {
        let raw = r#"{"recipient": "carol", "kind": "like", "message": "hi"}"#;
        let req: NotifyRequest = serde_json::from_str(raw).unwrap();
        assert!(req.related_entity_id.is_none());
    }
}
