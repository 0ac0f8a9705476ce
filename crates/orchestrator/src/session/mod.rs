//! Student profiles, conversation sessions and the service that runs turns
//! through the pipeline.

mod conversation;
mod profile;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};
use tutor_orchestrator_core::{ChatMessage, EmotionalState, UserInfo};

pub use conversation::{ConversationSession, MAX_SESSION_HISTORY, ToolInteraction};
pub use profile::{
    LearningRecord, StudentProfile, infer_emotional_state, infer_mastery_level,
    infer_teaching_style,
};

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::store::{KeyedStore, MemoryStore, StoreError};

const MAX_PROFILES: u64 = 10_000;
const MAX_SESSIONS: u64 = 10_000;
const RECENT_HISTORY: usize = 10;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session with this id, or it expired.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// No profile for this user.
    #[error("Student profile not found: {0}")]
    ProfileNotFound(String),

    /// Backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs conversation turns for known students.
#[derive(Clone)]
pub struct SessionService {
    pipeline: Arc<Pipeline>,
    profiles: Arc<dyn KeyedStore<StudentProfile>>,
    sessions: Arc<dyn KeyedStore<ConversationSession>>,
}

impl SessionService {
    #[must_use]
    pub fn new(
        pipeline: Arc<Pipeline>,
        profiles: Arc<dyn KeyedStore<StudentProfile>>,
        sessions: Arc<dyn KeyedStore<ConversationSession>>,
    ) -> Self {
        Self {
            pipeline,
            profiles,
            sessions,
        }
    }

    /// In-memory stores; sessions expire after `session_ttl` without activity.
    #[must_use]
    pub fn in_memory(pipeline: Arc<Pipeline>, session_ttl: Duration) -> Self {
        Self::new(
            pipeline,
            Arc::new(MemoryStore::<StudentProfile>::new(MAX_PROFILES)),
            Arc::new(MemoryStore::<ConversationSession>::with_idle_expiry(
                MAX_SESSIONS,
                session_ttl,
            )),
        )
    }

    /// In-memory service over a pipeline built from `config`, with sessions
    /// expiring after `config.session_ttl` of inactivity.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline's HTTP clients cannot be built.
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, OrchestratorError> {
        let pipeline = Pipeline::from_config(config)?;
        info!(
            session_ttl_secs = config.session_ttl.as_secs(),
            "Session service ready"
        );
        Ok(Self::in_memory(Arc::new(pipeline), config.session_ttl))
    }

    /// Open a session, creating the student's profile on first contact.
    ///
    /// An existing profile keeps its history and mastery.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    #[instrument(skip_all, fields(user_id = %user_info.user_id))]
    pub async fn start_session(
        &self,
        user_info: UserInfo,
    ) -> Result<ConversationSession, SessionError> {
        let user_id = user_info.user_id.clone();

        if self.profiles.get(&user_id).await?.is_none() {
            let profile = StudentProfile::from_user_info(user_info);
            info!(
                teaching_style = %profile.teaching_style,
                emotional_state = %profile.emotional_state,
                mastery_level = %profile.mastery_level,
                "Created student profile"
            );
            self.profiles.put(&user_id, profile).await?;
        }

        let session = ConversationSession::new(user_id);
        self.sessions.put(&session.session_id, session.clone()).await?;
        info!(session_id = %session.session_id, "Started session");
        Ok(session)
    }

    /// Run one student message through the pipeline within a session.
    ///
    /// The user turn and an assistant summary are appended to the session, and
    /// any tool call is recorded.
    ///
    /// The session is read again after the pipeline finishes, so turns that
    /// overlap on one session keep each other's history. The final
    /// read-modify-write is not atomic; a session is meant to take one turn at
    /// a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the session or profile is missing or a store
    /// operation fails. Pipeline failures are reported in the outcome.
    #[instrument(skip(self, message), fields(message_len = message.len()))]
    pub async fn handle_turn(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<PipelineOutcome, SessionError> {
        let session = self.load_session(session_id).await?;
        let profile = self.profile(&session.user_id).await?;

        let context = profile.context(session.chat_history, message);
        let outcome = self.pipeline.run(context).await;

        let mut session = self.load_session(session_id).await?;
        session.push_message(ChatMessage::user(message));
        session.push_message(ChatMessage::assistant(turn_summary(&outcome)));

        if let (Some(request), Some(response)) = (&outcome.tool_request, &outcome.tool_response) {
            session.record_interaction(&request.tool_name, request.to_payload(), response.clone());
        }

        self.sessions.put(session_id, session).await?;
        Ok(outcome)
    }

    /// Record progress on a topic and raise mastery.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile is missing or a store operation fails.
    #[instrument(skip(self))]
    pub async fn update_progress(
        &self,
        user_id: &str,
        topic: &str,
        mastery_increase: u8,
    ) -> Result<StudentProfile, SessionError> {
        let mut profile = self.profile(user_id).await?;
        profile.record_progress(topic, mastery_increase);
        info!(mastery_level = %profile.mastery_level, "Updated learning progress");
        self.profiles.put(user_id, profile.clone()).await?;
        Ok(profile)
    }

    /// Study suggestions from the student's mastery and emotional state.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile is missing or a store operation fails.
    pub async fn recommendations(&self, user_id: &str) -> Result<Vec<String>, SessionError> {
        let profile = self.profile(user_id).await?;
        Ok(recommend(&profile))
    }

    /// Fetch a session, `None` if unknown or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn session(&self, session_id: &str) -> Result<Option<ConversationSession>, SessionError> {
        Ok(self.sessions.get(session_id).await?)
    }

    /// Close a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn end_session(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions.delete(session_id).await?;
        Ok(())
    }

    async fn load_session(&self, session_id: &str) -> Result<ConversationSession, SessionError> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))
    }

    /// Fetch a student's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile is missing or the store fails.
    pub async fn profile(&self, user_id: &str) -> Result<StudentProfile, SessionError> {
        self.profiles
            .get(user_id)
            .await?
            .ok_or_else(|| SessionError::ProfileNotFound(user_id.to_string()))
    }
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// The assistant turn recorded after a pipeline run.
fn turn_summary(outcome: &PipelineOutcome) -> String {
    let tool = outcome
        .educational_intent
        .as_ref()
        .map_or("tool", |intent| intent.suggested_tool.as_str());

    if outcome.success {
        let mut summary = format!("[{tool}] Generated your learning material.");
        for question in outcome.clarifying_questions.values() {
            summary.push(' ');
            summary.push_str(question);
        }
        summary
    } else {
        let reason = outcome.error_message.as_deref().unwrap_or("unknown error");
        warn!(%tool, %reason, "Turn did not produce material");
        format!("[{tool}] I couldn't complete that request: {reason}")
    }
}

fn recommend(profile: &StudentProfile) -> Vec<String> {
    let by_mastery: &[&str] = match profile.mastery_level.get() {
        0..=3 => &[
            "Focus on foundational concepts",
            "Practice with basic examples",
            "Build confidence with simple exercises",
        ],
        4..=6 => &[
            "Practice intermediate applications",
            "Connect concepts to real-world examples",
            "Try more challenging problems",
        ],
        _ => &[
            "Explore advanced concepts",
            "Engage with complex problems",
            "Consider teaching others",
        ],
    };

    let mut recommendations: Vec<String> = by_mastery.iter().map(|s| (*s).to_string()).collect();

    let by_state = match profile.emotional_state {
        EmotionalState::Confused => Some("Take breaks and review basic concepts"),
        EmotionalState::Anxious => Some("Practice with supportive, low-pressure exercises"),
        EmotionalState::Focused => Some("Challenge yourself with advanced topics"),
        EmotionalState::Tired => None,
    };
    recommendations.extend(by_state.map(str::to_string));

    if let Some(topic) = profile.recent_topics(RECENT_HISTORY).last() {
        recommendations.push(format!("Revisit {topic} with a short review"));
    }

    recommendations
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use tutor_orchestrator_core::{ToolRequest, ToolResponse};

    use super::*;
    use crate::pipeline::WorkflowState;
    use crate::schema::ToolRegistry;
    use crate::tool_client::ToolInvoker;

    struct CannedInvoker;

    #[async_trait]
    impl ToolInvoker for CannedInvoker {
        async fn call(&self, request: &ToolRequest) -> ToolResponse {
            let topic = request.parameters.get("topic").and_then(serde_json::Value::as_str);
            let slow = topic == Some("atoms");
            tokio::time::sleep(Duration::from_millis(if slow { 40 } else { 5 })).await;
            ToolResponse::Success {
                data: json!({ "notes": "Photosynthesis converts light into chemical energy" }),
            }
        }
    }

    fn service() -> SessionService {
        let pipeline = Pipeline::new(
            Arc::new(ToolRegistry::builtin().unwrap()),
            Arc::new(CannedInvoker),
        );
        SessionService::in_memory(Arc::new(pipeline), Duration::from_secs(60))
    }

    fn user_info() -> UserInfo {
        UserInfo {
            user_id: "student-9".to_string(),
            name: "Ana".to_string(),
            grade_level: "11".to_string(),
            learning_style_summary: "Visual learner who likes diagrams".to_string(),
            emotional_state_summary: "Feeling confused about biology".to_string(),
            mastery_level_summary: "Level 2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_start_session_creates_profile_once() {
        let service = service();
        let first = service.start_session(user_info()).await.unwrap();
        service.update_progress("student-9", "cells", 3).await.unwrap();
        let second = service.start_session(user_info()).await.unwrap();

        assert_ne!(first.session_id, second.session_id);
        let profile = service.profile("student-9").await.unwrap();
        assert_eq!(profile.mastery_level.get(), 5);
        assert_eq!(profile.learning_history.len(), 1);
    }

    #[tokio::test]
    async fn test_handle_turn_records_history_and_interaction() {
        let service = service();
        let session = service.start_session(user_info()).await.unwrap();

        let outcome = service
            .handle_turn(&session.session_id, "Can you make notes about photosynthesis in biology")
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(outcome.workflow_trace.contains(&WorkflowState::ParametersExtracted));
        assert!(!outcome.workflow_trace.contains(&WorkflowState::ParametersFilled));

        let stored = service.session(&session.session_id).await.unwrap().unwrap();
        assert_eq!(stored.chat_history.len(), 2);
        assert_eq!(stored.chat_history[1].content, "[note_maker] Generated your learning material.");
        assert_eq!(stored.tool_interactions.len(), 1);
        assert_eq!(stored.tool_interactions[0].tool_name, "note_maker");
        let request = &stored.tool_interactions[0].request;
        assert_eq!(request["note_taking_style"], "structured");
        assert_eq!(request["include_analogies"], true);
        assert_eq!(request["subject"], "Biology");
    }

    #[tokio::test]
    async fn test_failed_turn_is_still_recorded() {
        let service = service();
        let session = service.start_session(user_info()).await.unwrap();

        let outcome = service.handle_turn(&session.session_id, "hello").await.unwrap();
        assert!(!outcome.success);

        let stored = service.session(&session.session_id).await.unwrap().unwrap();
        assert_eq!(stored.chat_history.len(), 2);
        assert!(stored.tool_interactions.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let err = service().handle_turn("missing", "hi").await.unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_end_session() {
        let service = service();
        let session = service.start_session(user_info()).await.unwrap();
        service.end_session(&session.session_id).await.unwrap();
        assert!(service.session(&session.session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recommendations() {
        let service = service();
        service.start_session(user_info()).await.unwrap();

        let recs = service.recommendations("student-9").await.unwrap();
        assert_eq!(recs[0], "Focus on foundational concepts");
        assert!(recs.contains(&"Take breaks and review basic concepts".to_string()));

        service.update_progress("student-9", "mitosis", 8).await.unwrap();
        let recs = service.recommendations("student-9").await.unwrap();
        assert_eq!(recs[0], "Explore advanced concepts");
        assert_eq!(recs.last().unwrap(), "Revisit mitosis with a short review");

        assert!(matches!(
            service.recommendations("nobody").await,
            Err(SessionError::ProfileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clarifying_questions_reach_the_student() {
        let service = service();
        let session = service.start_session(user_info()).await.unwrap();

        let outcome = service
            .handle_turn(&session.session_id, "Please help me take notes")
            .await
            .unwrap();
        assert!(outcome.clarifying_questions.contains_key("topic"));

        let stored = service.session(&session.session_id).await.unwrap().unwrap();
        let reply = &stored.chat_history[1].content;
        assert!(reply.starts_with("[note_maker] Generated your learning material."));
        assert!(reply.contains("What specific topic would you like to focus on, Ana?"));
        assert!(reply.contains("What subject area is this related to, Ana?"));
    }

    #[tokio::test]
    async fn test_overlapping_turns_keep_both_histories() {
        let service = service();
        let session = service.start_session(user_info()).await.unwrap();

        let (first, second) = tokio::join!(
            service.handle_turn(&session.session_id, "make notes about cells in biology"),
            service.handle_turn(&session.session_id, "make notes about atoms in chemistry"),
        );
        first.unwrap();
        second.unwrap();

        let stored = service.session(&session.session_id).await.unwrap().unwrap();
        assert_eq!(stored.chat_history.len(), 4);
        assert_eq!(stored.tool_interactions.len(), 2);
    }

    #[tokio::test]
    async fn test_from_config_uses_session_ttl() {
        let mut config = OrchestratorConfig::new(ToolRegistry::builtin().unwrap());
        config.session_ttl = Duration::from_millis(50);
        let service = SessionService::from_config(&config).unwrap();

        let session = service.start_session(user_info()).await.unwrap();
        assert!(service.session(&session.session_id).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(service.session(&session.session_id).await.unwrap().is_none());
        assert!(service.profile("student-9").await.is_ok());
    }

    struct UnavailableStore;

    #[async_trait]
    impl<T> KeyedStore<T> for UnavailableStore
    where
        T: Clone + Send + Sync + 'static,
    {
        async fn get(&self, _: &str) -> Result<Option<T>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn put(&self, _: &str, _: T) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failures_propagate() {
        let pipeline = Pipeline::new(
            Arc::new(ToolRegistry::builtin().unwrap()),
            Arc::new(CannedInvoker),
        );
        let service = SessionService::new(
            Arc::new(pipeline),
            Arc::new(UnavailableStore),
            Arc::new(UnavailableStore),
        );

        let err = service.start_session(user_info()).await.unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::Backend(_))));
        assert_eq!(err.to_string(), "Store backend error: connection refused");
    }
}
