//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{AuthResponse, LoginRequest, LogoutResponse, SignupRequest},
    middleware::CurrentUser,
    protocol::{MessageDto, SessionDto},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chat_core::ports::PortError;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        list_sessions_handler,
        session_messages_handler,
        delete_session_handler,
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
    ),
    components(
        schemas(
            HealthResponse,
            SessionDto,
            MessageDto,
            SignupRequest,
            LoginRequest,
            AuthResponse,
            LogoutResponse
        )
    ),
    tags(
        (name = "Chat Assistant API", description = "Chat history and account endpoints. Chat turns travel over the /ws WebSocket.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    /// `false` when the service runs in memory-only mode.
    persistence: bool,
    model: String,
}

fn port_error_response(e: PortError, action: &str) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        other => {
            error!("Failed to {}: {:?}", action, other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {}", action),
            )
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Reports whether the service is up and whether chat history is persisted.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_handler(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        persistence: app_state.persistence_enabled(),
        model: app_state.config.chat_model.clone(),
    })
}

/// List the current user's most recently updated sessions (at most 20).
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "Sessions, newest first", body = [SessionDto]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let listing = app_state.controller.list_sessions(user_id).await;
    if let Some(notice) = listing.notices.into_iter().next() {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, notice.message));
    }
    let sessions: Vec<SessionDto> = listing.sessions.into_iter().map(SessionDto::from).collect();
    Ok(Json(sessions))
}

/// Fetch the full, ordered message history of one session.
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/messages",
    responses(
        (status = 200, description = "Messages in creation order", body = [MessageDto]),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("session_id" = Uuid, Path, description = "The session to load.")
    )
)]
pub async fn session_messages_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let messages = app_state
        .controller
        .session_history(user_id, session_id)
        .await
        .map_err(|e| port_error_response(e, "load messages"))?;
    let messages: Vec<MessageDto> = messages.iter().map(MessageDto::from).collect();
    Ok(Json(messages))
}

/// Delete a session together with all of its messages.
#[utoipa::path(
    delete,
    path = "/sessions/{session_id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("session_id" = Uuid, Path, description = "The session to delete.")
    )
)]
pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    app_state
        .controller
        .remove_session(user_id, session_id)
        .await
        .map_err(|e| port_error_response(e, "delete session"))?;
    Ok(StatusCode::NO_CONTENT)
}
