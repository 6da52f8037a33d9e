//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/sessions", post(http::http_start_session))
        .route(
            "/api/v1/sessions/:id",
            get(http::http_get_session).delete(http::http_delete_session),
        )
        .route("/api/v1/sessions/:id/next", post(http::http_next_problem))
        .route("/api/v1/sessions/:id/answer", post(http::http_post_answer))
        .route("/api/v1/sessions/:id/hint", get(http::http_get_hint))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::logic::tests::offline_state;

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn practice_flow_over_http() {
        let app = build_router(Arc::new(offline_state()));

        let (status, started) = call(&app, "POST", "/api/v1/sessions", Some(json!({ "skill": "algebra" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(started["session"]["difficulty"], 1);
        assert_eq!(started["session"]["ability"], 0.5);
        assert_eq!(started["session"]["phase"]["state"], "awaiting_answer");
        assert!(started["problem"].get("expectedAnswer").is_none());
        let id = started["sessionId"].as_str().unwrap().to_string();
        let learner = started["learnerId"].as_str().unwrap().to_string();

        let (status, answered) = call(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/answer"),
            Some(json!({ "answer": "x=5", "elapsedSeconds": 12.5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(answered["isCorrect"], true);
        assert_eq!(answered["session"]["difficulty"], 2);
        assert_eq!(answered["progress"]["xp"], 5);
        assert_eq!(answered["session"]["phase"]["isCorrect"], true);

        let (status, again) = call(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/answer"),
            Some(json!({ "answer": "x=5" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(again["error"].as_str().unwrap().contains("no problem"));

        let (status, next) = call(&app, "POST", &format!("/api/v1/sessions/{id}/next"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(next["problem"]["problemStatement"], "If 3x + 5 = 14, what is the value of x?");

        let (status, _) = call(&app, "DELETE", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Same learner, new session: XP is still there.
        let (status, resumed) = call(
            &app,
            "POST",
            "/api/v1/sessions",
            Some(json!({ "skill": "geometry", "learnerId": learner })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = resumed["sessionId"].as_str().unwrap();
        let (_, view) = call(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(view["learnerId"], learner.as_str());
        assert_eq!(view["progress"]["xp"], 5);
        assert_eq!(view["session"]["attempts"], 0);
    }

    #[tokio::test]
    async fn blank_learner_id_is_a_bad_request() {
        let app = build_router(Arc::new(offline_state()));
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/sessions",
            Some(json!({ "skill": "algebra", "learnerId": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("learner id"));
    }

    #[tokio::test]
    async fn empty_answer_is_a_bad_request() {
        let app = build_router(Arc::new(offline_state()));
        let (_, started) = call(&app, "POST", "/api/v1/sessions", Some(json!({ "skill": "geometry" }))).await;
        let id = started["sessionId"].as_str().unwrap();

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/answer"),
            Some(json!({ "answer": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "answer must not be empty");

        let (status, hint) = call(&app, "GET", &format!("/api/v1/sessions/{id}/hint"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(hint["text"].as_str().unwrap().contains("x-coordinate"));
    }

    #[tokio::test]
    async fn health_reports_live_sessions() {
        let app = build_router(Arc::new(offline_state()));
        let (_, body) = call(&app, "GET", "/api/v1/health", None).await;
        assert_eq!(body, json!({ "ok": true, "sessions": 0, "learners": 0 }));
    }
}
