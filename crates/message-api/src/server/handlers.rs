//! Axum request handlers for all service endpoints.

use std::future::Future;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{ErrorResponse, HealthResponse};
use common::ServiceError;
use tracing::{debug, warn};

use super::{middleware::STORE_TIMEOUT, state::AppState};
use crate::db::{Message, PersistError, MESSAGE_TEXT};

/// `GET /api` — insert a new `helloworld` message and confirm it.
///
/// Each call writes exactly one new document. A persist failure or a write
/// that outlives [`STORE_TIMEOUT`] is not retried; it surfaces as an opaque
/// `500`.
pub async fn hello(State(state): State<AppState>) -> Response {
    let insert = state.store.insert(Message::new(MESSAGE_TEXT));
    match bounded(STORE_TIMEOUT, insert).await {
        Ok(saved) => {
            debug!(id = ?saved.id(), "message persisted");
            (StatusCode::OK, confirmation(&saved)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "failed to persist message");
            error_response(&ServiceError::Persist(e.to_string()))
        }
    }
}

/// `GET /health` — database reachability check.
///
/// Returns `200 OK` when the database answers `ping`, `503` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let database_reachable = match bounded(STORE_TIMEOUT, state.store.ping()).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "database ping failed");
            false
        }
    };

    let (status_code, status_str) = if database_reachable {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        database_reachable,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> Response {
    error_response(&ServiceError::NotFound("no route".into()))
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, PersistError>>,
) -> Result<T, PersistError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(PersistError::TimedOut(limit)))
}

fn confirmation(message: &Message) -> String {
    format!("Hello, World! Document inserted with msg: {}", message.msg())
}

fn error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(err))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use std::future::Future;
use std::time::Duration;

use axum::{body::Body, http::Request, routing::get, Router};
    use mongodb::bson::{doc, oid::ObjectId, Document};
    use tower::ServiceExt;

    use crate::db::store::MockMessageStore;
    use crate::db::MessageStore;

    fn connection_refused() -> PersistError {
        mongodb::error::Error::from(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))
        .into()
    }

    /// Keeps inserted documents in memory and assigns ids like the database.
    #[derive(Default)]
    struct MemoryStore {
        docs: Mutex<Vec<Document>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageStore for MemoryStore {
        async fn insert(&self, message: Message) -> Result<Message, PersistError> {
            if self.fail {
                return Err(connection_refused());
            }
            let mut doc = message.to_document();
            doc.insert("_id", ObjectId::new());
            self.docs.lock().unwrap().push(doc.clone());
            Ok(Message::from_document(&doc)?)
        }

        async fn ping(&self) -> Result<(), PersistError> {
            Ok(())
        }
    }

    fn test_router(store: Arc<dyn MessageStore>) -> Router {
        Router::new()
            .route("/api", get(hello))
            .route("/health", get(health))
            .with_state(AppState::new(store))
    }

    async fn call(app: &Router, uri: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn hello_inserts_fresh_message_and_confirms() {
        let mut store = MockMessageStore::new();
        store
            .expect_insert()
            .withf(|m| m.msg() == "helloworld" && m.id().is_none())
            .times(1)
            .returning(|m| {
                Ok(Message::from_document(&doc! { "_id": ObjectId::new(), "msg": m.msg() }).unwrap())
            });

        let (status, body) = call(&test_router(Arc::new(store)), "/api").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello, World! Document inserted with msg: helloworld");
    }

    #[tokio::test]
    async fn repeated_calls_insert_distinct_documents() {
        let store = Arc::new(MemoryStore::default());
        let app = test_router(store.clone());

        for _ in 0..5 {
            let (status, _) = call(&app, "/api").await;
            assert_eq!(status, StatusCode::OK);
        }

        let docs = store.docs.lock().unwrap();
        assert_eq!(docs.len(), 5);
        let ids: HashSet<ObjectId> = docs.iter().map(|d| d.get_object_id("_id").unwrap()).collect();
        assert_eq!(ids.len(), 5);
        assert!(docs.iter().all(|d| d.get_str("msg").unwrap() == "helloworld"));
    }

    #[tokio::test]
    async fn persist_failure_is_opaque_500_and_stores_nothing() {
        let store = Arc::new(MemoryStore {
            fail: true,
            ..Default::default()
        });
        let (status, body) = call(&test_router(store.clone()), "/api").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let err: ErrorResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(err.code, "internal_error");
        assert!(!body.contains("connection refused"));
        assert!(store.docs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn health_reports_reachable_database() {
        let mut store = MockMessageStore::new();
        store.expect_ping().times(1).returning(|| Ok(()));

        let (status, body) = call(&test_router(Arc::new(store)), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(health.status, "ok");
        assert!(health.database_reachable);
    }

    #[tokio::test]
    async fn health_returns_503_when_database_unreachable() {
        let mut store = MockMessageStore::new();
        store
            .expect_ping()
            .returning(|| Err(connection_refused()));

        let (status, body) = call(&test_router(Arc::new(store)), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let health: HealthResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(health.status, "degraded");
        assert!(!health.database_reachable);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_call_becomes_timed_out_error() {
        let err = bounded(STORE_TIMEOUT, std::future::pending::<Result<(), PersistError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::TimedOut(limit) if limit == STORE_TIMEOUT));
    }

    #[test]
    fn confirmation_embeds_message_text() {
        assert_eq!(
            confirmation(&Message::new("abc")),
            "Hello, World! Document inserted with msg: abc"
        );
    }
}
