use crate::api::ApiResult;
use crate::auth::{bearer_token, delete_session};
use crate::db::DbPool;
use crate::get_conn;
use axum::{extract::State, http::HeaderMap, http::StatusCode};
use std::sync::Arc;

/// Delete the caller's session. Succeeds whether or not the token was valid.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Session ended")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(State(pool): State<Arc<DbPool>>, headers: HeaderMap) -> ApiResult<StatusCode> {
    if let Ok(token) = bearer_token(&headers) {
        let mut conn = get_conn!(pool);
        let removed = delete_session(&mut conn, token)?;
        tracing::debug!(removed, "logout");
    }
    Ok(StatusCode::NO_CONTENT)
}
