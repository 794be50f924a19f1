pub mod serve;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for signed storage URLs. These carry their own
/// authorization and are mounted outside the bearer-auth layer.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/storage/{*path}", get(serve::serve_object))
}

#[derive(OpenApi)]
#[openapi(paths(serve::serve_object))]
pub struct ApiDoc;
