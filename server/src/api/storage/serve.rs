use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::images::processing::render_cover;
use crate::state::AppState;
use crate::storage::{content_type_for, SignatureError, StorageError, SIGNED_URL_TTL_SECS};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SignedParams {
    /// Unix time after which the link stops working
    pub expires: i64,
    /// Square rendition size, when the link was signed with one
    pub size: Option<u32>,
    /// Hex HMAC-SHA256 over path, expires and size
    pub signature: String,
}

#[utoipa::path(
    get,
    path = "/api/storage/{path}",
    tag = "storage",
    params(
        ("path" = String, Path, description = "Storage path of the object"),
        SignedParams
    ),
    responses(
        (status = 200, description = "Object data", content_type = "image/jpeg"),
        (status = 403, description = "Invalid or expired signature", body = ErrorResponse),
        (status = 404, description = "Object not found", body = ErrorResponse)
    )
)]
pub async fn serve_object(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<SignedParams>,
) -> ApiResult<Response> {
    state
        .signer
        .verify(
            &path,
            params.expires,
            params.size,
            &params.signature,
            Utc::now().timestamp(),
        )
        .map_err(|e: SignatureError| ApiError::Forbidden(e.to_string()))?;

    let data = state.storage.get(&path).await.map_err(|e| match e {
        StorageError::NotFound(_) | StorageError::InvalidPath(_) => {
            ApiError::not_found("Object not found")
        }
        other => ApiError::Storage(other),
    })?;

    let (content_type, body) = match params.size {
        Some(size) => {
            let rendition = tokio::task::spawn_blocking(move || render_cover(&data, size))
                .await
                .map_err(|e| ApiError::Internal(format!("Rendition task failed: {}", e)))?
                .map_err(ApiError::Internal)?;
            ("image/jpeg", rendition)
        }
        None => (content_type_for(&path), data),
    };

    let cache_control = format!("private, max-age={}", SIGNED_URL_TTL_SECS);
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CACHE_CONTROL, cache_control),
        ],
        body,
    )
        .into_response())
}
