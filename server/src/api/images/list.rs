use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::get_conn;
use crate::images::processing::MAX_RENDITION_SIZE;
use crate::images::signed;
use crate::recipes::{find_owned, load_images};
use crate::state::AppState;
use crate::types::ImageDto;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListImagesParams {
    /// Square rendition size in pixels (clamped to 1..=800)
    pub size: Option<i64>,
}

fn rendition_size(size: Option<i64>) -> Option<u32> {
    size.map(|s| s.clamp(1, i64::from(MAX_RENDITION_SIZE)) as u32)
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/images",
    tag = "images",
    params(
        ("id" = Uuid, Path, description = "Recipe ID"),
        ListImagesParams
    ),
    responses(
        (status = 200, description = "Images with signed URLs, in position order", body = Vec<ImageDto>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_images(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListImagesParams>,
) -> ApiResult<Json<Vec<ImageDto>>> {
    let size = rendition_size(params.size);
    let mut conn = get_conn!(state.pool);

    let recipe =
        find_owned(&mut conn, user.id, id)?.ok_or_else(|| ApiError::not_found("Recipe not found"))?;
    let images = load_images(&mut conn, recipe.id)?;

    Ok(Json(
        images
            .into_iter()
            .map(|image| signed(&state, image, size))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendition_size_is_clamped() {
        assert_eq!(rendition_size(None), None);
        assert_eq!(rendition_size(Some(0)), Some(1));
        assert_eq!(rendition_size(Some(-40)), Some(1));
        assert_eq!(rendition_size(Some(320)), Some(320));
        assert_eq!(rendition_size(Some(5000)), Some(800));
    }
}
