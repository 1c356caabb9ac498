mod common;

use chat_core::domain::{Message, Role};
use chat_core::ports::{ModelError, NoopConversationStore};
use chat_core::{NoticeLevel, SessionController};
use common::{MemoryStore, ScriptedModel};
use std::sync::Arc;
use uuid::Uuid;

fn controller_with(store: Arc<MemoryStore>, model: Arc<ScriptedModel>) -> SessionController {
    SessionController::new(store, model)
}

fn setup() -> (SessionController, Arc<MemoryStore>, Arc<ScriptedModel>) {
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(ScriptedModel::new());
    (controller_with(store.clone(), model.clone()), store, model)
}

//=========================================================================================
// submit_turn
//=========================================================================================

#[tokio::test]
async fn first_turn_creates_titled_session_and_stores_both_messages() {
    let (controller, store, model) = setup();
    model.push_reply("Hi there!");

    let state = controller.new_state(None);
    let step = controller.submit_turn(state, "Hello").await;

    assert!(step.notices.is_empty());
    let state = step.state;
    assert_eq!(
        state.transcript(),
        &[Message::user("Hello"), Message::assistant("Hi there!")]
    );
    let session_id = state.session_id().expect("session should be bound");
    assert_eq!(store.session_count(), 1);
    assert_eq!(store.title_of(session_id).as_deref(), Some("Hello"));
    assert_eq!(
        store.stored_messages(session_id),
        vec![Message::user("Hello"), Message::assistant("Hi there!")]
    );
}

#[tokio::test]
async fn empty_and_whitespace_input_is_ignored() {
    let (controller, store, model) = setup();

    let state = controller.new_state(None).with_pending_input("   ");
    let step = controller.submit_turn(state, "").await;
    assert!(step.state.transcript().is_empty());
    assert!(step.state.session_id().is_none());

    let step = controller.submit_turn(step.state, " \n\t ").await;
    assert!(step.state.transcript().is_empty());
    assert!(step.state.session_id().is_none());
    assert!(step.notices.is_empty());
    assert_eq!(store.create_calls(), 0);
    assert!(model.seen_histories().is_empty());
}

#[tokio::test]
async fn later_turns_never_change_the_title() {
    let (controller, store, _model) = setup();

    let long_first = "x".repeat(70);
    let step = controller
        .submit_turn(controller.new_state(None), &long_first)
        .await;
    let session_id = step.state.session_id().unwrap();
    assert_eq!(store.title_of(session_id), Some("x".repeat(50)));

    let step = controller.submit_turn(step.state, "Something else").await;
    assert_eq!(store.title_of(session_id), Some("x".repeat(50)));
    assert_eq!(step.state.transcript().len(), 4);
    assert_eq!(store.stored_messages(session_id).len(), 4);
}

#[tokio::test]
async fn quota_error_leaves_transcript_on_user_message() {
    let (controller, store, model) = setup();
    model.push_error(ModelError::QuotaExceeded("429".to_string()));

    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;

    assert_eq!(step.state.transcript(), &[Message::user("Hello")]);
    assert_eq!(step.notices.len(), 1);
    assert_eq!(step.notices[0].level, NoticeLevel::Error);
    let session_id = step.state.session_id().unwrap();
    assert_eq!(store.stored_messages(session_id), vec![Message::user("Hello")]);
    assert!(step.state.conversation().is_empty());
}

#[tokio::test]
async fn user_can_resubmit_after_model_failure() {
    let (controller, _store, model) = setup();
    model.push_error(ModelError::Network("reset".to_string()));
    model.push_reply("Back online");

    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;
    let step = controller.submit_turn(step.state, "Hello").await;

    let roles: Vec<Role> = step.state.transcript().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
    assert_eq!(step.state.transcript()[2].content, "Back online");
}

#[tokio::test]
async fn submit_clears_pending_input() {
    let (controller, _store, _model) = setup();
    let state = controller.new_state(None).with_pending_input("Hello");
    let step = controller.submit_turn(state, "Hello").await;
    assert_eq!(step.state.pending_input(), "");
}

#[tokio::test]
async fn failed_session_creation_keeps_turn_in_memory() {
    let (controller, store, _model) = setup();
    store.fail_create(true);

    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;

    assert_eq!(step.state.transcript().len(), 2);
    assert!(step.state.session_id().is_none());
    assert_eq!(step.state.provisional().len(), 2);
    assert_eq!(step.notices.len(), 1);
    assert_eq!(step.notices[0].level, NoticeLevel::Warning);
    assert_eq!(store.session_count(), 0);
}

#[tokio::test]
async fn user_message_is_kept_when_both_store_and_model_fail() {
    let (controller, store, model) = setup();
    store.fail_create(true);
    model.push_error(ModelError::Unavailable("down".to_string()));

    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;

    assert_eq!(step.state.transcript(), &[Message::user("Hello")]);
    assert!(step.state.session_id().is_none());
    assert_eq!(step.state.provisional(), &[Message::user("Hello")]);
    let levels: Vec<NoticeLevel> = step.notices.iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![NoticeLevel::Warning, NoticeLevel::Error]);
    assert_eq!(store.create_calls(), 1);
}

#[tokio::test]
async fn provisional_messages_are_stored_once_a_session_exists() {
    let (controller, store, _model) = setup();
    store.fail_create(true);
    let step = controller
        .submit_turn(controller.new_state(None), "First question")
        .await;

    store.fail_create(false);
    let step = controller.submit_turn(step.state, "Second question").await;

    let session_id = step.state.session_id().unwrap();
    assert!(step.state.provisional().is_empty());
    assert_eq!(
        store.stored_messages(session_id),
        vec![
            Message::user("First question"),
            Message::assistant("echo: First question"),
            Message::user("Second question"),
            Message::assistant("echo: Second question"),
        ]
    );
    assert_eq!(store.title_of(session_id).as_deref(), Some("First question"));
}

#[tokio::test]
async fn failed_saves_warn_but_do_not_block_the_turn() {
    let (controller, store, _model) = setup();
    store.fail_insert(true);

    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;

    assert_eq!(step.state.transcript().len(), 2);
    assert_eq!(step.notices.len(), 2);
    assert!(step
        .notices
        .iter()
        .all(|n| n.level == NoticeLevel::Warning));
    let session_id = step.state.session_id().unwrap();
    assert!(store.stored_messages(session_id).is_empty());
    assert_eq!(store.title_of(session_id).as_deref(), Some("New Chat"));
}

#[tokio::test]
async fn owner_is_recorded_on_created_sessions() {
    let (controller, _store, _model) = setup();
    let owner = Uuid::new_v4();

    let step = controller
        .submit_turn(controller.new_state(Some(owner)), "Hello")
        .await;

    let listing = controller.list_sessions(Some(owner)).await;
    assert_eq!(listing.sessions.len(), 1);
    assert_eq!(Some(listing.sessions[0].id), step.state.session_id());
    assert!(controller.list_sessions(None).await.sessions.is_empty());
}

#[tokio::test]
async fn memory_only_mode_never_binds_a_session() {
    let model = Arc::new(ScriptedModel::new());
    let controller = SessionController::new(Arc::new(NoopConversationStore), model);
    assert!(!controller.persistence_enabled());

    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;

    assert!(step.notices.is_empty());
    assert!(step.state.session_id().is_none());
    assert_eq!(step.state.transcript().len(), 2);
    assert!(controller.list_sessions(None).await.sessions.is_empty());
}

//=========================================================================================
// Conversation lifecycle
//=========================================================================================

#[tokio::test]
async fn new_conversation_resets_transcript_and_model_history() {
    let (controller, store, model) = setup();
    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;
    assert!(!step.state.conversation().is_empty());

    let step = controller.start_new_conversation(step.state);
    assert!(step.state.transcript().is_empty());
    assert!(step.state.session_id().is_none());
    assert!(step.state.conversation().is_empty());
    assert_eq!(store.session_count(), 1);

    controller.submit_turn(step.state, "Fresh start").await;
    assert!(model.seen_histories().last().unwrap().is_empty());
    assert_eq!(store.session_count(), 2);
}

#[tokio::test]
async fn switching_restores_display_history_but_not_model_context() {
    let (controller, store, model) = setup();
    let history = vec![
        Message::user("What is Rust?"),
        Message::assistant("A systems language."),
    ];
    let session_id = store.seed(None, "What is Rust?", &history);

    let step = controller
        .submit_turn(controller.new_state(None), "Unrelated")
        .await;
    let step = controller.switch_to_session(step.state, session_id).await;

    assert!(step.notices.is_empty());
    assert_eq!(step.state.session_id(), Some(session_id));
    assert_eq!(step.state.transcript(), history.as_slice());
    assert!(step.state.conversation().is_empty());

    let step = controller.submit_turn(step.state, "Tell me more").await;
    assert!(model.seen_histories().last().unwrap().is_empty());
    assert_eq!(step.state.transcript().len(), 4);
    assert_eq!(store.stored_messages(session_id).len(), 4);
    assert_eq!(store.title_of(session_id).as_deref(), Some("What is Rust?"));
}

#[tokio::test]
async fn switching_to_unknown_session_keeps_current_state() {
    let (controller, _store, _model) = setup();
    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;
    let bound = step.state.session_id();

    let step = controller
        .switch_to_session(step.state, Uuid::new_v4())
        .await;

    assert_eq!(step.notices.len(), 1);
    assert_eq!(step.state.session_id(), bound);
    assert_eq!(step.state.transcript().len(), 2);
}

#[tokio::test]
async fn sessions_of_other_users_are_hidden() {
    let (controller, store, _model) = setup();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let alices = store.seed(Some(alice), "Private", &[Message::user("secret")]);

    let step = controller
        .switch_to_session(controller.new_state(Some(bob)), alices)
        .await;
    assert_eq!(step.notices.len(), 1);
    assert!(step.state.transcript().is_empty());

    let step = controller.delete_session(step.state, alices).await;
    assert_eq!(step.notices.len(), 1);
    assert_eq!(store.session_count(), 1);
    assert!(controller.session_history(None, alices).await.is_err());
}

#[tokio::test]
async fn deleting_the_bound_session_starts_over() {
    let (controller, store, _model) = setup();
    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;
    let session_id = step.state.session_id().unwrap();

    let step = controller.delete_session(step.state, session_id).await;

    assert!(step.notices.is_empty());
    assert!(step.state.transcript().is_empty());
    assert!(step.state.session_id().is_none());
    assert!(step.state.conversation().is_empty());
    assert!(store.stored_messages(session_id).is_empty());
    let listing = controller.list_sessions(None).await;
    assert!(listing.sessions.iter().all(|s| s.id != session_id));
}

#[tokio::test]
async fn deleting_another_session_keeps_the_current_one() {
    let (controller, store, _model) = setup();
    let other = store.seed(None, "Old chat", &[Message::user("old")]);
    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;
    let bound = step.state.session_id();

    let step = controller.delete_session(step.state, other).await;

    assert_eq!(step.state.session_id(), bound);
    assert_eq!(step.state.transcript().len(), 2);
    assert_eq!(store.session_count(), 1);
}

#[tokio::test]
async fn failed_delete_warns_and_still_leaves_the_session() {
    let (controller, store, _model) = setup();
    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;
    let session_id = step.state.session_id().unwrap();
    store.fail_delete(true);

    let step = controller.delete_session(step.state, session_id).await;

    assert_eq!(step.notices.len(), 1);
    assert!(step.state.session_id().is_none());
    assert_eq!(store.session_count(), 1);
}

#[tokio::test]
async fn deleting_the_bound_session_resets_even_when_lookup_fails() {
    let (controller, store, _model) = setup();
    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;
    let session_id = step.state.session_id().unwrap();
    store.fail_get(true);

    let step = controller.delete_session(step.state, session_id).await;

    assert!(step.notices.is_empty());
    assert!(step.state.session_id().is_none());
    assert!(step.state.transcript().is_empty());
    assert!(step.state.conversation().is_empty());
    assert_eq!(store.session_count(), 0);
    assert!(store.stored_messages(session_id).is_empty());
}

#[tokio::test]
async fn deleting_an_unbound_session_needs_a_successful_lookup() {
    let (controller, store, _model) = setup();
    let other = store.seed(None, "Old chat", &[Message::user("old")]);
    let step = controller
        .submit_turn(controller.new_state(None), "Hello")
        .await;
    let bound = step.state.session_id();
    store.fail_get(true);

    let step = controller.delete_session(step.state, other).await;

    assert_eq!(step.notices.len(), 1);
    assert_eq!(step.state.session_id(), bound);
    assert_eq!(store.session_count(), 2);
}

//=========================================================================================
// list_sessions
//=========================================================================================

#[tokio::test]
async fn listing_is_newest_first_and_capped_at_twenty() {
    let (controller, store, _model) = setup();
    let ids: Vec<Uuid> = (0..25)
        .map(|i| store.seed(None, &format!("chat {}", i), &[]))
        .collect();

    let listing = controller.list_sessions(None).await;

    assert!(listing.notices.is_empty());
    assert_eq!(listing.sessions.len(), 20);
    assert_eq!(listing.sessions[0].id, ids[24]);
    assert!(listing
        .sessions
        .windows(2)
        .all(|w| w[0].updated_at >= w[1].updated_at));
}

#[tokio::test]
async fn listing_failure_becomes_a_warning() {
    let (controller, store, _model) = setup();
    store.fail_list(true);

    let listing = controller.list_sessions(None).await;

    assert!(listing.sessions.is_empty());
    assert_eq!(listing.notices.len(), 1);
    assert_eq!(listing.notices[0].level, NoticeLevel::Warning);
}
