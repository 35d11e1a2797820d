//! Axum router construction.

use axum::{routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/api", get(handlers::hello))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use common::protocol::{ErrorResponse, HealthResponse};
    use mongodb::bson::{doc, oid::ObjectId};

    use crate::db::store::MockMessageStore;
    use crate::db::{Message, MessageStore, PersistError};

    /// A database that accepts the call and never answers.
    struct StalledStore;

    #[async_trait]
    impl MessageStore for StalledStore {
        async fn insert(&self, _message: Message) -> Result<Message, PersistError> {
            std::future::pending().await
        }

        async fn ping(&self) -> Result<(), PersistError> {
            std::future::pending().await
        }
    }

    fn stalled_server() -> TestServer {
        TestServer::new(build(AppState::new(Arc::new(StalledStore)))).unwrap()
    }

    fn server(store: MockMessageStore) -> TestServer {
        TestServer::new(build(AppState::new(Arc::new(store)))).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let resp = server(MockMessageStore::new()).get("/unknown").await;
        resp.assert_status(StatusCode::NOT_FOUND);
        assert!(resp.text().contains("not_found"));
    }

    #[tokio::test]
    async fn api_route_returns_plain_text_confirmation() {
        let mut store = MockMessageStore::new();
        store.expect_insert().times(1).returning(|m| {
            Ok(Message::from_document(&doc! { "_id": ObjectId::new(), "msg": m.msg() }).unwrap())
        });

        let resp = server(store).get("/api").await;
        resp.assert_status_ok();
        resp.assert_text("Hello, World! Document inserted with msg: helloworld");
        let content_type = resp.header("content-type");
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    }

    #[tokio::test]
    async fn api_route_only_accepts_get() {
        let resp = server(MockMessageStore::new()).post("/api").await;
        resp.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_route_exists() {
        let mut store = MockMessageStore::new();
        store.expect_ping().returning(|| Ok(()));

        let resp = server(store).get("/health").await;
        resp.assert_status_ok();
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_database_write_returns_500_before_request_timeout() {
        let started = tokio::time::Instant::now();
        let resp = stalled_server().get("/api").await;

        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = resp.json();
        assert_eq!(body.code, "internal_error");
        assert!(started.elapsed() < middleware::REQUEST_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_database_ping_reports_503() {
        let resp = stalled_server().get("/health").await;

        resp.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let health: HealthResponse = resp.json();
        assert!(!health.database_reachable);
    }
}
