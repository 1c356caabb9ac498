//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a chat WebSocket connection.
//! The connection owns one `ChatState` and feeds every client message through
//! the `SessionController`, one at a time.

use crate::web::{
    middleware::CurrentUser,
    protocol::{ClientMessage, MessageDto, ServerMessage, SessionDto},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use chat_core::{ChatState, Notice};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(mut socket: WebSocket, app_state: Arc<AppState>, user_id: Option<Uuid>) {
    info!("New chat connection established for user: {:?}", user_id);
    let controller = &app_state.controller;
    let mut state = controller.new_state(user_id);

    // --- 1. Greeting ---
    let mut greeting = vec![ServerMessage::Ready {
        persistence: app_state.persistence_enabled(),
        authenticated: user_id.is_some(),
    }];
    if !app_state.persistence_enabled() {
        greeting.push(
            Notice::warning(
                "Chat history is disabled because no database is configured. \
                 Conversations are kept only for this connection.",
            )
            .into(),
        );
    }
    greeting.push(transcript_message(&state));
    if app_state.persistence_enabled() {
        greeting.extend(sessions_messages(&app_state, user_id).await);
    }
    if send_all(&mut socket, greeting).await.is_err() {
        error!("Failed to send greeting.");
        return;
    }

    // --- 2. Main Message Loop ---
    loop {
        let Some(Ok(msg)) = socket.recv().await else {
            info!("Client disconnected.");
            break;
        };
        match msg {
            Message::Text(text) => {
                let (next, replies) = handle_text_message(text.as_str(), &app_state, state).await;
                state = next;
                if send_all(&mut socket, replies).await.is_err() {
                    warn!("Failed to send reply, closing connection.");
                    break;
                }
            }
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    info!("Chat connection closed.");
}

/// Applies one client message to the conversation and returns the next state
/// together with the messages to send back.
async fn handle_text_message(
    text: &str,
    app_state: &AppState,
    state: ChatState,
) -> (ChatState, Vec<ServerMessage>) {
    let controller = &app_state.controller;
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let reply = ServerMessage::Error {
                message: format!("Malformed message: {}", e),
            };
            return (state, vec![reply]);
        }
    };

    let owner = state.owner();
    let (step, refresh_sessions) = match client_msg {
        ClientMessage::SubmitTurn { text } => {
            let was_bound = state.session_id().is_some();
            let step = controller.submit_turn(state, &text).await;
            let newly_bound = !was_bound && step.state.session_id().is_some();
            (step, newly_bound)
        }
        ClientMessage::UpdateDraft { text } => {
            return (state.with_pending_input(text), Vec::new());
        }
        ClientMessage::NewConversation => (controller.start_new_conversation(state), false),
        ClientMessage::SwitchSession { session_id } => {
            (controller.switch_to_session(state, session_id).await, false)
        }
        ClientMessage::DeleteSession { session_id } => {
            (controller.delete_session(state, session_id).await, true)
        }
        ClientMessage::ListSessions => {
            return (state, sessions_messages(app_state, owner).await);
        }
    };

    let mut replies: Vec<ServerMessage> = step.notices.into_iter().map(Into::into).collect();
    replies.push(transcript_message(&step.state));
    if refresh_sessions && app_state.persistence_enabled() {
        replies.extend(sessions_messages(app_state, owner).await);
    }
    (step.state, replies)
}

fn transcript_message(state: &ChatState) -> ServerMessage {
    ServerMessage::Transcript {
        session_id: state.session_id(),
        messages: state.transcript().iter().map(MessageDto::from).collect(),
        draft: state.pending_input().to_string(),
    }
}

/// The sidebar listing, preceded by any warning raised while loading it.
async fn sessions_messages(app_state: &AppState, owner: Option<Uuid>) -> Vec<ServerMessage> {
    let listing = app_state.controller.list_sessions(owner).await;
    let mut messages: Vec<ServerMessage> = listing.notices.into_iter().map(Into::into).collect();
    messages.push(ServerMessage::Sessions {
        sessions: listing.sessions.into_iter().map(SessionDto::from).collect(),
    });
    messages
}

async fn send_all(socket: &mut WebSocket, messages: Vec<ServerMessage>) -> Result<(), axum::Error> {
    for msg in messages {
        let json = serde_json::to_string(&msg).map_err(axum::Error::new)?;
        socket.send(Message::Text(json.into())).await?;
    }
    Ok(())
}
