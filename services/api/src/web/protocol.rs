//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API
//! server, plus the JSON shapes shared with the REST endpoints.

use chat_core::domain::{Message, SessionSummary};
use chat_core::{Notice, NoticeLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submits one line of user input. Blank text is ignored.
    SubmitTurn { text: String },

    /// Mirrors the contents of the input box so the draft survives a re-render.
    UpdateDraft { text: String },

    /// Clears the conversation. A stored session is only created on the next submit.
    NewConversation,

    /// Loads a stored session into the transcript.
    SwitchSession { session_id: Uuid },

    /// Deletes a stored session and all of its messages.
    DeleteSession { session_id: Uuid },

    /// Requests the sidebar listing.
    ListSessions,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after the connection opens.
    Ready {
        persistence: bool,
        authenticated: bool,
    },

    /// The full transcript of the current conversation.
    Transcript {
        session_id: Option<Uuid>,
        messages: Vec<MessageDto>,
        draft: String,
    },

    /// The sessions visible to the current user, newest first.
    Sessions { sessions: Vec<SessionDto> },

    /// A non-blocking warning or error to display.
    Notice { level: NoticeLevelDto, message: String },

    /// Reports a malformed client message.
    Error { message: String },
}

//=========================================================================================
// Shared JSON Shapes
//=========================================================================================

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct MessageDto {
    /// Either `user` or `assistant`.
    pub role: String,
    pub content: String,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct SessionDto {
    pub id: Uuid,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

impl From<SessionSummary> for SessionDto {
    fn from(summary: SessionSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            updated_at: summary.updated_at,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevelDto {
    Warning,
    Error,
}

impl From<Notice> for ServerMessage {
    fn from(notice: Notice) -> Self {
        let level = match notice.level {
            NoticeLevel::Warning => NoticeLevelDto::Warning,
            NoticeLevel::Error => NoticeLevelDto::Error,
        };
        ServerMessage::Notice {
            level,
            message: notice.message,
        }
    }
}
