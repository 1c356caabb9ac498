//! In-memory fakes of the core ports, shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chat_core::domain::{Message, Session, SessionSummary};
use chat_core::ports::{
    ConversationHandle, ConversationStore, ModelClient, ModelError, PortError, PortResult,
};
use chrono::{Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct StoreInner {
    sessions: Vec<Session>,
    messages: Vec<(Uuid, Message)>,
    clock: i64,
    fail_create: bool,
    fail_insert: bool,
    fail_list: bool,
    fail_delete: bool,
    fail_get: bool,
    create_calls: usize,
}

/// A conversation store backed by vectors, with switchable failures.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(&self, fail: bool) {
        self.inner.lock().unwrap().fail_create = fail;
    }

    pub fn fail_insert(&self, fail: bool) {
        self.inner.lock().unwrap().fail_insert = fail;
    }

    pub fn fail_list(&self, fail: bool) {
        self.inner.lock().unwrap().fail_list = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.inner.lock().unwrap().fail_delete = fail;
    }

    pub fn fail_get(&self, fail: bool) {
        self.inner.lock().unwrap().fail_get = fail;
    }

    pub fn create_calls(&self) -> usize {
        self.inner.lock().unwrap().create_calls
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub fn title_of(&self, session_id: Uuid) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .map(|s| s.title.clone())
    }

    pub fn stored_messages(&self, session_id: Uuid) -> Vec<Message> {
        self.inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|(id, _)| *id == session_id)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Seeds a session with history, bypassing the controller.
    pub fn seed(&self, owner: Option<Uuid>, title: &str, messages: &[Message]) -> Uuid {
        let mut inner = self.inner.lock().unwrap();
        let id = Uuid::new_v4();
        let now = tick(&mut inner);
        inner.sessions.push(Session {
            id,
            title: title.to_string(),
            owner,
            created_at: now,
            updated_at: now,
        });
        for message in messages {
            inner.messages.push((id, message.clone()));
        }
        id
    }
}

fn tick(inner: &mut StoreInner) -> chrono::DateTime<Utc> {
    inner.clock += 1;
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(inner.clock)
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_session(&self, title: &str, owner: Option<Uuid>) -> PortResult<Uuid> {
        let mut inner = self.inner.lock().unwrap();
        inner.create_calls += 1;
        if inner.fail_create {
            return Err(PortError::Unexpected("connection refused".to_string()));
        }
        let id = Uuid::new_v4();
        let now = tick(&mut inner);
        inner.sessions.push(Session {
            id,
            title: title.to_string(),
            owner,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_get {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        inner
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn insert_message(&self, session_id: Uuid, message: &Message) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_insert {
            return Err(PortError::Unexpected("insert failed".to_string()));
        }
        let now = tick(&mut inner);
        if let Some(session) = inner.sessions.iter_mut().find(|s| s.id == session_id) {
            session.updated_at = now;
        }
        inner.messages.push((session_id, message.clone()));
        Ok(())
    }

    async fn list_messages(&self, session_id: Uuid) -> PortResult<Vec<Message>> {
        Ok(self.stored_messages(session_id))
    }

    async fn list_sessions(
        &self,
        owner: Option<Uuid>,
        limit: usize,
    ) -> PortResult<Vec<SessionSummary>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_list {
            return Err(PortError::Unexpected("list failed".to_string()));
        }
        let mut sessions: Vec<Session> = inner
            .sessions
            .iter()
            .filter(|s| s.owner == owner)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions.into_iter().take(limit).map(Into::into).collect())
    }

    async fn update_session_title(&self, session_id: Uuid, title: &str) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let now = tick(&mut inner);
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;
        session.title = title.to_string();
        session.updated_at = now;
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_delete {
            return Err(PortError::Unexpected("delete failed".to_string()));
        }
        inner.sessions.retain(|s| s.id != session_id);
        inner.messages.retain(|(id, _)| *id != session_id);
        Ok(())
    }
}

/// A model that answers from a script, falling back to echoing the prompt.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    seen_histories: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(reply.to_string()));
    }

    pub fn push_error(&self, error: ModelError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// The model-side history as it was at the moment of each call.
    pub fn seen_histories(&self) -> Vec<Vec<Message>> {
        self.seen_histories.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn send_turn(
        &self,
        conversation: &mut ConversationHandle,
        text: &str,
    ) -> Result<String, ModelError> {
        self.seen_histories
            .lock()
            .unwrap()
            .push(conversation.history().to_vec());
        let scripted = self.replies.lock().unwrap().pop_front();
        let reply = match scripted {
            Some(Ok(reply)) => reply,
            Some(Err(e)) => return Err(e),
            None => format!("echo: {}", text),
        };
        conversation.record_turn(text, &reply);
        Ok(reply)
    }
}
