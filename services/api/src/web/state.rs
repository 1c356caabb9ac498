//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every handler. Per-conversation
//! state (`ChatState`) is not stored here: each WebSocket connection owns its
//! own and threads it through the `SessionController`.

use crate::config::Config;
use chat_core::ports::AccountStore;
use chat_core::SessionController;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: SessionController,
    /// `None` in memory-only mode, where accounts cannot be stored.
    pub accounts: Option<Arc<dyn AccountStore>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn persistence_enabled(&self) -> bool {
        self.controller.persistence_enabled()
    }
}
