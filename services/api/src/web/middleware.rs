//! services/api/src/web/middleware.rs
//!
//! Authentication middleware: resolving the current user from the session
//! cookie, and protecting routes when accounts are mandatory.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::web::state::AppState;

/// The user behind the current request, `None` for anonymous visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Option<Uuid>);

/// Reads the login session id from the `session` cookie.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie, if any, and inserts a
/// `CurrentUser` into request extensions for handlers to use.
///
/// Missing, expired or unknown cookies make the request anonymous; they never
/// reject it.
pub async fn identify_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let mut user_id = None;
    if let (Some(accounts), Some(auth_session_id)) =
        (state.accounts.as_ref(), session_cookie(req.headers()))
    {
        match accounts.validate_auth_session(auth_session_id).await {
            Ok(id) => user_id = Some(id),
            Err(e) => warn!("Ignoring invalid auth session: {:?}", e),
        }
    }

    req.extensions_mut().insert(CurrentUser(user_id));
    next.run(req).await
}

/// Middleware that rejects anonymous requests with 401 Unauthorized.
/// Must run after `identify_user`.
pub async fn require_auth(req: Request, next: Next) -> Result<Response, StatusCode> {
    match req.extensions().get::<CurrentUser>() {
        Some(CurrentUser(Some(_))) => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}
