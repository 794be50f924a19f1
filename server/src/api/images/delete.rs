use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::get_conn;
use crate::models::RecipeImage;
use crate::schema::{recipe_images, recipes};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use uuid::Uuid;

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/images/{image_id}",
    tag = "images",
    params(
        ("id" = Uuid, Path, description = "Recipe ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_image(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let image: RecipeImage = {
        let mut conn = get_conn!(state.pool);
        recipe_images::table
            .inner_join(recipes::table)
            .filter(recipe_images::id.eq(image_id))
            .filter(recipe_images::recipe_id.eq(id))
            .filter(recipes::user_id.eq(user.id))
            .select(RecipeImage::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Image not found"))?
    };

    state.storage.delete(&image.storage_path).await?;

    let mut conn = get_conn!(state.pool);
    diesel::delete(recipe_images::table.filter(recipe_images::id.eq(image.id))).execute(&mut conn)?;

    tracing::info!(recipe_id = %id, image_id = %image.id, "deleted image");

    Ok(StatusCode::NO_CONTENT)
}
