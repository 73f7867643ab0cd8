//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::rest::{admin, board, messages};
use super::state::AppState;
use super::stream::stream_messages;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // The board is served to browsers from anywhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/messages",
            get(messages::list_messages).post(messages::post_message),
        )
        .route("/api/channels", get(board::list_channels))
        .route("/api/announcement", get(board::get_announcement))
        .route("/api/stats", get(board::get_stats))
        .route("/api/stream", get(stream_messages))
        .route("/api/admin/announcement", put(admin::put_announcement))
        .route("/api/admin/messages/:index", delete(admin::delete_message))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::store::MessageStore;
    use crate::types::{Message, MessagePage};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn test_app(configure: impl FnOnce(&mut RelayConfig)) -> (Router, Arc<MessageStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = RelayConfig::with_data_dir(temp_dir.path());
        config.rate_window = Duration::ZERO;
        config.admin_secret = Some("letmein".to_string());
        configure(&mut config);
        let store = Arc::new(MessageStore::open(&config).unwrap());
        let state = Arc::new(AppState::new(Arc::clone(&store), &config));
        (create_router(state), store, temp_dir)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _store, _dir) = test_app(|_| {});

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_post_then_list() {
        let (app, _store, _dir) = test_app(|_| {});

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/messages",
                json!({"channel": "공지", "text": "급수차 도착", "nickname": "소방서"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let posted: Message = body_json(response).await;
        assert_eq!(posted.id, 1);
        assert_eq!(posted.nickname, "소방서");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/messages?page=1&pageSize=10&channel=%EA%B3%B5%EC%A7%80")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page: MessagePage = body_json(response).await;
        assert_eq!(page.total, 1);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.items[0], posted);
    }

    #[tokio::test]
    async fn test_post_validation_error() {
        let (app, store, _dir) = test_app(|_| {});

        let response = app
            .oneshot(post_json("/api/messages", json!({"channel": "A", "text": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["error"], "text is empty");
        assert!(store.recent().is_empty());
    }

    #[tokio::test]
    async fn test_post_rate_limited() {
        let (app, _store, _dir) = test_app(|c| c.rate_window = Duration::from_secs(60));

        let first = app
            .clone()
            .oneshot(post_json("/api/messages", json!({"channel": "A", "text": "one"})))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(post_json("/api/messages", json!({"channel": "A", "text": "two"})))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = second.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry_after > 0 && retry_after <= 60);
        let body: Value = body_json(second).await;
        assert_eq!(body["code"], "RATE_LIMITED");
    }

    #[tokio::test]
    async fn test_admin_delete_requires_secret() {
        let (app, store, _dir) = test_app(|_| {});
        store
            .post(&crate::types::NewMessage::new("A", "spam"), "c")
            .unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/admin/messages/0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(store.recent().len(), 1);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/admin/messages/0")
                    .header("x-admin-secret", "letmein")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(store.recent().is_empty());

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/admin/messages/0")
                    .header("x-admin-secret", "letmein")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_announcement_roundtrip() {
        let (app, _store, _dir) = test_app(|_| {});

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/admin/announcement")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("x-admin-secret", "letmein")
                    .body(Body::from(json!({"announcement": "대피소: 시청"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/announcement")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body: Value = body_json(response).await;
        assert_eq!(body["announcement"], "대피소: 시청");
    }

    #[tokio::test]
    async fn test_admin_disabled_without_secret() {
        let (app, _store, _dir) = test_app(|c| c.admin_secret = None);

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/admin/announcement")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("x-admin-secret", "")
                    .body(Body::from(json!({"announcement": "x"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_channels_and_stats() {
        let (app, store, _dir) = test_app(|_| {});
        for channel in ["일반", "공지", "일반"] {
            store
                .post(&crate::types::NewMessage::new(channel, "x"), "c")
                .unwrap();
        }

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/channels").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let channels: Value = body_json(response).await;
        assert_eq!(channels, json!([{"channel": "공지", "count": 1}, {"channel": "일반", "count": 2}]));

        let response = app
            .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let stats: Value = body_json(response).await;
        assert_eq!(stats["buffered"], 3);
        assert_eq!(stats["pendingRecords"], 3);
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_contract() {
        let (app, store, _dir) = test_app(|_| {});

        let response = app
            .oneshot(post_json("/api/messages", json!({"channel": "A", "text": 5})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["error"].as_str().unwrap().contains("invalid type"));
        assert!(store.recent().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_rate_limited_first() {
        let (app, _store, _dir) = test_app(|c| c.rate_window = Duration::from_secs(60));

        let first = app
            .clone()
            .oneshot(post_json("/api/messages", json!({"channel": "A", "text": "one"})))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let response = app
            .oneshot(post_json("/api/messages", json!({"channel": "A", "text": 5})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_bad_page_numbers_are_normalized() {
        let (app, store, _dir) = test_app(|_| {});
        store
            .post(&crate::types::NewMessage::new("A", "x"), "c")
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/messages?page=-1&pageSize=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page: MessagePage = body_json(response).await;
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 20);
        assert_eq!(page.total, 1);
    }

    /// Read an SSE body to the end; it ends once every store handle is gone
    async fn drain_stream(response: Response) -> String {
        let bytes = tokio::time::timeout(
            Duration::from_secs(5),
            to_bytes(response.into_body(), usize::MAX),
        )
        .await
        .unwrap()
        .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_stream_forwards_only_requested_channel() {
        let (app, store, _dir) = test_app(|_| {});

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stream?channel=%EA%B3%B5%EC%A7%80")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for (channel, text) in [("공지", "n1"), ("일반", "g1"), ("공지", "n2")] {
            store
                .post(&crate::types::NewMessage::new(channel, text), "c")
                .unwrap();
        }
        drop(store);

        let body = drain_stream(response).await;
        assert_eq!(body.matches("event: message").count(), 2);
        assert!(body.contains(r#""text":"n1""#));
        assert!(body.contains(r#""text":"n2""#));
        assert!(!body.contains(r#""text":"g1""#));
    }

    #[tokio::test]
    async fn test_stream_reports_lag_to_slow_client() {
        let (app, store, _dir) = test_app(|_| {});

        let response = app
            .oneshot(Request::builder().uri("/api/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();

        for i in 0..1100 {
            store
                .post(&crate::types::NewMessage::new("A", format!("m{}", i)), "c")
                .unwrap();
        }
        drop(store);

        let body = drain_stream(response).await;
        assert!(body.contains("event: error"));
        assert!(body.contains("lagged"));
        assert!(body.contains(r#""text":"m1099""#));
        assert!(!body.contains(r#""text":"m0""#));
    }
}
