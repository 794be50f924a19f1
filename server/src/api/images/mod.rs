pub mod delete;
pub mod list;
pub mod upload;

use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for recipe image endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/images",
            get(list::list_images)
                .post(upload::upload_image)
                .layer(DefaultBodyLimit::max(upload::BODY_LIMIT)),
        )
        .route("/{id}/images/{image_id}", delete(delete::delete_image))
}

#[derive(OpenApi)]
#[openapi(
    paths(list::list_images, upload::upload_image, delete::delete_image),
    components(schemas(upload::UploadImageRequest))
)]
pub struct ApiDoc;
