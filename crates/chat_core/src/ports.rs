//! crates/chat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{Message, Session, SessionSummary, User, UserCredentials};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all store operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failure kinds reported by a model provider.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("The model is unavailable: {0}")]
    Unavailable(String),
    #[error("The model quota has been exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Network error while contacting the model: {0}")]
    Network(String),
}

//=========================================================================================
// Conversation Store
//=========================================================================================

/// Row-level access to the sessions and messages tables.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Whether writes to this store are durable. The controller skips every
    /// persistence step when this is false.
    fn is_persistent(&self) -> bool {
        true
    }

    async fn create_session(&self, title: &str, owner: Option<Uuid>) -> PortResult<Uuid>;

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session>;

    /// Appends a message and bumps the session's `updated_at`.
    async fn insert_message(&self, session_id: Uuid, message: &Message) -> PortResult<()>;

    /// Messages in ascending creation order.
    async fn list_messages(&self, session_id: Uuid) -> PortResult<Vec<Message>>;

    /// Sessions whose owner equals `owner`, most recently updated first.
    async fn list_sessions(
        &self,
        owner: Option<Uuid>,
        limit: usize,
    ) -> PortResult<Vec<SessionSummary>>;

    /// The caller is responsible for truncating the title.
    async fn update_session_title(&self, session_id: Uuid, title: &str) -> PortResult<()>;

    /// Removes the session together with all of its messages.
    async fn delete_session(&self, session_id: Uuid) -> PortResult<()>;
}

/// The store used when no database is configured. Nothing is ever saved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConversationStore;

#[async_trait]
impl ConversationStore for NoopConversationStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn create_session(&self, _title: &str, _owner: Option<Uuid>) -> PortResult<Uuid> {
        Err(PortError::Unexpected(
            "Persistence is disabled in memory-only mode".to_string(),
        ))
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        Err(PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn insert_message(&self, _session_id: Uuid, _message: &Message) -> PortResult<()> {
        Ok(())
    }

    async fn list_messages(&self, session_id: Uuid) -> PortResult<Vec<Message>> {
        Err(PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn list_sessions(
        &self,
        _owner: Option<Uuid>,
        _limit: usize,
    ) -> PortResult<Vec<SessionSummary>> {
        Ok(Vec::new())
    }

    async fn update_session_title(&self, _session_id: Uuid, _title: &str) -> PortResult<()> {
        Ok(())
    }

    async fn delete_session(&self, _session_id: Uuid) -> PortResult<()> {
        Ok(())
    }
}

//=========================================================================================
// Model Client
//=========================================================================================

/// The model-side history of one transcript.
///
/// A handle only ever grows through successful turns. Starting a new
/// conversation or switching sessions replaces it with a fresh, empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHandle {
    history: Vec<Message>,
}

impl ConversationHandle {
    pub fn new(prior_history: Vec<Message>) -> Self {
        Self {
            history: prior_history,
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Records a completed turn. Adapters call this only after a reply arrived.
    pub fn record_turn(&mut self, user_text: &str, reply: &str) {
        self.history.push(Message::user(user_text));
        self.history.push(Message::assistant(reply));
    }
}

/// A stateful conversational endpoint.
#[async_trait]
pub trait ModelClient: Send + Sync {
    fn begin_conversation(&self, prior_history: Vec<Message>) -> ConversationHandle {
        ConversationHandle::new(prior_history)
    }

    /// Sends `text` as the next user turn and returns the reply.
    /// On failure the handle is left untouched.
    async fn send_turn(
        &self,
        conversation: &mut ConversationHandle,
        text: &str,
    ) -> Result<String, ModelError>;
}

//=========================================================================================
// Account Store (authenticated variant)
//=========================================================================================

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        auth_session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the user behind an unexpired login session.
    async fn validate_auth_session(&self, auth_session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, auth_session_id: &str) -> PortResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_store_is_not_persistent_and_lists_nothing() {
        let store = NoopConversationStore;
        assert!(!store.is_persistent());
        assert!(store.list_sessions(None, 20).await.unwrap().is_empty());
        assert!(store.create_session("New Chat", None).await.is_err());
    }

    #[test]
    fn handle_records_turns_in_order() {
        let mut handle = ConversationHandle::default();
        handle.record_turn("hi", "hello");
        assert_eq!(
            handle.history(),
            &[Message::user("hi"), Message::assistant("hello")]
        );
    }
}
