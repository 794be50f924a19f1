use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::get_conn;
use crate::recipes::{find_owned, load_images};
use crate::schema::recipes;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use uuid::Uuid;

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut conn = get_conn!(state.pool);

    // Children cascade; import rows keep their history with recipe_id = NULL
    let blob_paths = conn.transaction(|conn| {
        let recipe = find_owned(conn, user.id, id)?
            .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

        let paths: Vec<String> = load_images(conn, recipe.id)?
            .into_iter()
            .map(|image| image.storage_path)
            .collect();

        diesel::delete(recipes::table.filter(recipes::id.eq(recipe.id))).execute(conn)?;
        Ok::<_, ApiError>(paths)
    })?;
    drop(conn);

    for path in &blob_paths {
        if let Err(e) = state.storage.delete(path).await {
            tracing::warn!(recipe_id = %id, path, "Failed to remove image blob: {}", e);
        }
    }

    tracing::info!(recipe_id = %id, images = blob_paths.len(), "deleted recipe");

    Ok(StatusCode::NO_CONTENT)
}
