//! crates/chat_core/src/controller.rs
//!
//! The session controller coordinates one conversation's transcript, the
//! conversation store and the model client.
//!
//! Every store call is best-effort: a failure becomes a `Notice` and the
//! in-memory state carries on. Model failures are reported the same way and
//! leave the transcript ending on the user's message.

use crate::domain::{
    session_title_from, Message, Role, Session, SessionSummary, DEFAULT_SESSION_TITLE,
    SESSION_LIST_LIMIT,
};
use crate::ports::{ConversationStore, ModelClient, PortError, PortResult};
use crate::state::ChatState;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

//=========================================================================================
// Notices and Transitions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// A non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The result of a controller operation: the next state and what to tell the user.
#[derive(Debug)]
pub struct Transition {
    pub state: ChatState,
    pub notices: Vec<Notice>,
}

impl Transition {
    fn quiet(state: ChatState) -> Self {
        Self {
            state,
            notices: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct SessionListing {
    pub sessions: Vec<SessionSummary>,
    pub notices: Vec<Notice>,
}

//=========================================================================================
// The Controller
//=========================================================================================

#[derive(Clone)]
pub struct SessionController {
    store: Arc<dyn ConversationStore>,
    model: Arc<dyn ModelClient>,
}

impl SessionController {
    pub fn new(store: Arc<dyn ConversationStore>, model: Arc<dyn ModelClient>) -> Self {
        Self { store, model }
    }

    pub fn persistence_enabled(&self) -> bool {
        self.store.is_persistent()
    }

    /// A fresh conversation for `owner` with an empty model history.
    pub fn new_state(&self, owner: Option<Uuid>) -> ChatState {
        ChatState::new(owner, self.model.begin_conversation(Vec::new()))
    }

    /// Handles one submitted line of user input.
    ///
    /// Blank input is ignored. Otherwise the user message is appended first,
    /// then the session is created if needed, then the message is stored and
    /// finally the model is asked for a reply.
    pub async fn submit_turn(&self, state: ChatState, text: &str) -> Transition {
        if text.trim().is_empty() {
            return Transition::quiet(state);
        }

        let mut state = state;
        let mut notices = Vec::new();

        state.transcript.push(Message::user(text));

        if self.store.is_persistent() && state.session_id.is_none() {
            match self
                .store
                .create_session(DEFAULT_SESSION_TITLE, state.owner)
                .await
            {
                Ok(session_id) => {
                    info!("Created chat session {}", session_id);
                    state.session_id = Some(session_id);
                }
                Err(e) => {
                    warn!("Failed to create chat session: {:?}", e);
                    notices.push(Notice::warning(format!(
                        "Could not create a chat session, this turn will not be saved: {}",
                        e
                    )));
                }
            }
        }
        self.persist_pending(&mut state, &mut notices).await;

        match self.model.send_turn(&mut state.conversation, text).await {
            Ok(reply) => {
                state.transcript.push(Message::assistant(reply));
                self.persist_pending(&mut state, &mut notices).await;
            }
            Err(e) => {
                error!("Model call failed: {:?}", e);
                notices.push(Notice::error(format!("Error: {}", e)));
            }
        }

        state.pending_input.clear();
        Transition { state, notices }
    }

    /// Clears the transcript, unbinds the session and resets the model history.
    /// Nothing is written to the store.
    pub fn start_new_conversation(&self, state: ChatState) -> Transition {
        Transition::quiet(self.new_state(state.owner))
    }

    /// Binds `session_id` and replaces the transcript with its stored history.
    ///
    /// The model history starts empty: prior messages are displayed but not
    /// replayed to the model.
    pub async fn switch_to_session(&self, state: ChatState, session_id: Uuid) -> Transition {
        let messages = match self.session_history(state.owner, session_id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Failed to load session {}: {:?}", session_id, e);
                return Transition {
                    state,
                    notices: vec![Notice::warning(format!(
                        "Could not load that conversation: {}",
                        e
                    ))],
                };
            }
        };

        info!(
            "Switched to session {} with {} messages",
            session_id,
            messages.len()
        );
        let mut next = self.new_state(state.owner);
        next.synced = messages.len();
        next.transcript = messages;
        next.session_id = Some(session_id);
        next.pending_input = state.pending_input;
        Transition::quiet(next)
    }

    /// Deletes a session and its messages. If it is the bound session the
    /// conversation is reset as by `start_new_conversation`, whether or not
    /// the store call succeeds.
    pub async fn delete_session(&self, state: ChatState, session_id: Uuid) -> Transition {
        let mut notices = Vec::new();
        let bound = state.session_id == Some(session_id);

        // The bound session was owner-checked when it was created or switched to.
        if !bound {
            if let Err(e) = self.owned_session(state.owner, session_id).await {
                warn!("Refusing to delete session {}: {:?}", session_id, e);
                return Transition {
                    state,
                    notices: vec![Notice::warning(format!(
                        "Could not delete that conversation: {}",
                        e
                    ))],
                };
            }
        }

        if let Err(e) = self.store.delete_session(session_id).await {
            warn!("Failed to delete session {}: {:?}", session_id, e);
            notices.push(Notice::warning(format!(
                "Could not delete that conversation: {}",
                e
            )));
        } else {
            info!("Deleted session {}", session_id);
        }

        let state = if bound {
            self.new_state(state.owner)
        } else {
            state
        };
        Transition { state, notices }
    }

    /// The newest sessions visible to `owner`, at most `SESSION_LIST_LIMIT`.
    pub async fn list_sessions(&self, owner: Option<Uuid>) -> SessionListing {
        match self.store.list_sessions(owner, SESSION_LIST_LIMIT).await {
            Ok(mut sessions) => {
                sessions.truncate(SESSION_LIST_LIMIT);
                SessionListing {
                    sessions,
                    notices: Vec::new(),
                }
            }
            Err(e) => {
                warn!("Failed to list sessions: {:?}", e);
                SessionListing {
                    sessions: Vec::new(),
                    notices: vec![Notice::warning(format!(
                        "Could not load chat history: {}",
                        e
                    ))],
                }
            }
        }
    }

    /// The ordered messages of a session owned by `owner`.
    pub async fn session_history(
        &self,
        owner: Option<Uuid>,
        session_id: Uuid,
    ) -> PortResult<Vec<Message>> {
        self.owned_session(owner, session_id).await?;
        self.store.list_messages(session_id).await
    }

    /// Deletes a session owned by `owner`, propagating any failure.
    pub async fn remove_session(&self, owner: Option<Uuid>, session_id: Uuid) -> PortResult<()> {
        self.owned_session(owner, session_id).await?;
        self.store.delete_session(session_id).await
    }

    /// Looks up a session, hiding sessions that belong to someone else.
    async fn owned_session(&self, owner: Option<Uuid>, session_id: Uuid) -> PortResult<Session> {
        let session = self.store.get_session(session_id).await?;
        if session.owner != owner {
            return Err(PortError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }
        Ok(session)
    }

    /// Hands every transcript entry not yet offered to the store over to it,
    /// naming the session after its first user message.
    ///
    /// A failed save is reported but not retried.
    async fn persist_pending(&self, state: &mut ChatState, notices: &mut Vec<Notice>) {
        let Some(session_id) = state.session_id else {
            return;
        };
        if !self.store.is_persistent() {
            return;
        }

        let first_user = state.first_user_index();
        while state.synced < state.transcript.len() {
            let index = state.synced;
            let message = &state.transcript[index];
            state.synced += 1;

            if let Err(e) = self.store.insert_message(session_id, message).await {
                warn!("Failed to save message to session {}: {:?}", session_id, e);
                notices.push(Notice::warning(format!("Could not save message: {}", e)));
                continue;
            }

            if message.role == Role::User && first_user == Some(index) {
                let title = session_title_from(&message.content);
                if let Err(e) = self.store.update_session_title(session_id, &title).await {
                    warn!("Failed to set title of session {}: {:?}", session_id, e);
                    notices.push(Notice::warning(format!(
                        "Could not update the chat title: {}",
                        e
                    )));
                }
            }
        }
    }
}
