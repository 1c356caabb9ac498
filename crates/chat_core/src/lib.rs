pub mod controller;
pub mod domain;
pub mod ports;
pub mod state;

pub use controller::{Notice, NoticeLevel, SessionController, SessionListing, Transition};
pub use domain::{Message, Role, Session, SessionSummary, User, UserCredentials};
pub use ports::{
    AccountStore, ConversationHandle, ConversationStore, ModelClient, ModelError,
    NoopConversationStore, PortError, PortResult,
};
pub use state::ChatState;
