pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers the binary wires into the router.
pub use auth::{login_handler, logout_handler, signup_handler};
pub use middleware::{identify_user, require_auth};
pub use rest::{delete_session_handler, health_handler, list_sessions_handler, session_messages_handler};
pub use ws_handler::ws_handler;
