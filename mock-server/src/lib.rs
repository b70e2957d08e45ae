use std::{
    collections::{BTreeMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::debug;

pub const DEFAULT_API_KEY: &str = "test-api-key";
pub const DEFAULT_CREDITS: u64 = 10_000;

/// A canned response served ahead of normal routing.
#[derive(Clone, Debug)]
pub struct Scripted {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Scripted {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// Shared state behind the router. Cloning shares the same queue and counter.
#[derive(Clone)]
pub struct MockState {
    api_key: Arc<str>,
    credits: u64,
    script: Arc<Mutex<VecDeque<Scripted>>>,
    hits: Arc<AtomicUsize>,
}

impl MockState {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: Arc::from(api_key),
            credits: DEFAULT_CREDITS,
            script: Arc::default(),
            hits: Arc::default(),
        }
    }

    /// Queue a response for the next authenticated request.
    pub fn enqueue(&self, response: Scripted) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    /// Requests received so far, rejected ones included.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn next_scripted(&self) -> Option<Scripted> {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY)
    }
}

pub fn app(state: MockState) -> Router {
    Router::new()
        .route("/credits", get(credits))
        .route("/slow/{millis}", get(slow))
        .fallback(echo)
        .layer(middleware::from_fn_with_state(state.clone(), scripted))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(middleware::from_fn_with_state(state.clone(), count_hits))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

async fn count_hits(State(state): State<MockState>, request: Request, next: Next) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    debug!(method = %request.method(), uri = %request.uri(), "mock request");
    next.run(request).await
}

async fn require_api_key(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    if presented != Some(&*state.api_key) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid API key" })),
        )
            .into_response();
    }
    next.run(request).await
}

async fn scripted(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let Some(canned) = state.next_scripted() else {
        return next.run(request).await;
    };
    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, canned.body).into_response();
    for (name, value) in canned.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

async fn credits(State(state): State<MockState>) -> Json<Value> {
    Json(json!({ "credits": state.credits }))
}

async fn slow(Path(millis): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(json!({ "slept_ms": millis }))
}

/// Reflect the request back so clients can assert on what they sent.
async fn echo(
    method: Method,
    uri: Uri,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": query,
        "headers": {
            "x-api-key": header("x-api-key"),
            "user-agent": header("user-agent"),
            "content-type": header("content-type"),
        },
        "body": body,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_builder_collects_headers() {
        let s = Scripted::status(429).header("Retry-After", "120").body("{}");
        assert_eq!(s.status, 429);
        assert_eq!(s.headers, vec![("Retry-After".to_string(), "120".to_string())]);
        assert_eq!(s.body, "{}");
    }

    #[test]
    fn queue_is_first_in_first_out() {
        let state = MockState::default();
        state.enqueue(Scripted::status(503));
        state.enqueue(Scripted::status(200));
        assert_eq!(state.next_scripted().unwrap().status, 503);
        assert_eq!(state.next_scripted().unwrap().status, 200);
        assert!(state.next_scripted().is_none());
    }

    #[test]
    fn clones_share_the_queue() {
        let state = MockState::new("k");
        let clone = state.clone();
        clone.enqueue(Scripted::status(500));
        assert_eq!(state.next_scripted().unwrap().status, 500);
    }
}
