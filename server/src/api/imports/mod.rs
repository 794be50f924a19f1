pub mod create;
pub mod get;
pub mod list;
pub mod retry;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for import endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/import", post(create::import_recipe))
        .route("/imports", get(list::list_imports))
        .route("/imports/{id}", get(get::get_import))
        .route("/imports/{id}/retry", post(retry::retry_import))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::import_recipe,
        list::list_imports,
        get::get_import,
        retry::retry_import,
    ),
    components(schemas(
        create::ImportRecipeRequest,
        create::ImportRecipeResponse,
        list::ListImportsResponse,
    ))
)]
pub struct ApiDoc;
