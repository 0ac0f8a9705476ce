//! Integration test helpers for the tutor orchestrator.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tutor-integration-tests
//! ```
//!
//! Tests talk to local `axum` servers bound to ephemeral ports that stand in
//! for the educational tools and the model API. No external services are
//! needed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tutor_orchestrator::ToolRegistry;
use tutor_orchestrator_core::{
    ConversationContext, EmotionalState, MasteryLevel, TeachingStyle, UserInfo,
};
use url::Url;

/// What a mock server answers with.
#[derive(Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl MockReply {
    /// A JSON reply with the given status.
    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// A plain-text reply with the given status.
    #[must_use]
    pub fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Delay the reply.
    #[must_use]
    pub const fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone)]
struct MockState {
    reply: MockReply,
    received: Arc<Mutex<Vec<Value>>>,
}

/// A running mock server.
pub struct MockServer {
    pub url: Url,
    received: Arc<Mutex<Vec<Value>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    /// Start a server that answers every POST on `path` with `reply`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start(path: &str, reply: MockReply) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            reply,
            received: Arc::clone(&received),
        };

        let router = Router::new().route(path, post(respond)).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let url = Url::parse(&format!("http://{addr}")).expect("mock server url");
        Self {
            url,
            received,
            handle,
        }
    }

    /// Start a mock educational tool (`POST /generate`).
    pub async fn tool(reply: MockReply) -> Self {
        Self::start("/generate", reply).await
    }

    /// Bodies received so far.
    ///
    /// # Panics
    ///
    /// Panics if the request log lock is poisoned.
    #[must_use]
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().expect("request log").clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(State(state): State<MockState>, Json(body): Json<Value>) -> (StatusCode, String) {
    if let Ok(mut log) = state.received.lock() {
        log.push(body);
    }
    tokio::time::sleep(state.reply.delay).await;
    (state.reply.status, state.reply.body)
}

/// The built-in registry with `tool` pointed at `endpoint`.
///
/// # Panics
///
/// Panics if the built-in registry is invalid or `tool` is not registered.
#[must_use]
pub fn registry_with(tool: &str, endpoint: &Url) -> ToolRegistry {
    let mut registry = ToolRegistry::builtin().expect("built-in registry");
    assert!(registry.set_endpoint(tool, endpoint.clone()), "unknown tool {tool}");
    registry
}

/// A student profile for tests.
#[must_use]
pub fn user_info() -> UserInfo {
    UserInfo {
        user_id: "student-123".to_string(),
        name: "Jordan".to_string(),
        grade_level: "10".to_string(),
        learning_style_summary: "Learns well with structured outlines".to_string(),
        emotional_state_summary: "Focused and motivated".to_string(),
        mastery_level_summary: "Level 7 - proficient".to_string(),
    }
}

/// A context for `message` with the given state and mastery.
///
/// # Panics
///
/// Panics if `mastery` is outside 1-10.
#[must_use]
pub fn context(message: &str, emotional_state: EmotionalState, mastery: i64) -> ConversationContext {
    ConversationContext {
        user_info: user_info(),
        chat_history: vec![],
        current_message: message.to_string(),
        teaching_style: Some(TeachingStyle::Direct),
        emotional_state: Some(emotional_state),
        mastery_level: Some(MasteryLevel::new(mastery).expect("mastery level")),
    }
}
