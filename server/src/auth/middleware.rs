use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::db::get_user_from_token;
use super::extractor::{bearer_token, AuthError};

/// Middleware that requires a valid auth token for all requests.
/// The authenticated user is stored in the request extensions for
/// [`AuthUser`](super::AuthUser).
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(t) => t.to_string(),
        Err(e) => return e.into_response(),
    };

    let Some(user) = get_user_from_token(&state.pool, &token).await else {
        return AuthError::InvalidToken.into_response();
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}
