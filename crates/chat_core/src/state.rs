//! crates/chat_core/src/state.rs
//!
//! The explicit state of one chat conversation. The presentation layer owns a
//! `ChatState` per connection and threads it through the `SessionController`,
//! which consumes it and hands back the next one.

use crate::domain::{Message, Role};
use crate::ports::ConversationHandle;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ChatState {
    pub(crate) owner: Option<Uuid>,
    pub(crate) session_id: Option<Uuid>,
    pub(crate) transcript: Vec<Message>,
    /// Number of leading transcript entries already handed to the store.
    /// Entries past this index are provisional.
    pub(crate) synced: usize,
    pub(crate) conversation: ConversationHandle,
    pub(crate) pending_input: String,
}

impl ChatState {
    /// An empty conversation with no bound session.
    pub fn new(owner: Option<Uuid>, conversation: ConversationHandle) -> Self {
        Self {
            owner,
            session_id: None,
            transcript: Vec::new(),
            synced: 0,
            conversation,
            pending_input: String::new(),
        }
    }

    pub fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn conversation(&self) -> &ConversationHandle {
        &self.conversation
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    /// Messages appended while no session was bound and not yet stored.
    pub fn provisional(&self) -> &[Message] {
        &self.transcript[self.synced..]
    }

    pub fn with_pending_input(mut self, text: impl Into<String>) -> Self {
        self.pending_input = text.into();
        self
    }

    /// Index of the first user message, which is the one that names the session.
    pub(crate) fn first_user_index(&self) -> Option<usize> {
        self.transcript
            .iter()
            .position(|m| m.role == Role::User)
    }
}
