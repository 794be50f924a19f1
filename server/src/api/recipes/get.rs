use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::get_conn;
use crate::images::signed;
use crate::recipes::{find_owned, latest_import, load_images, with_children};
use crate::state::AppState;
use crate::types::{ImageDto, ImportDto, IngredientDto, RecipeDto, StepDto};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub recipe: RecipeDto,
    pub ingredients: Vec<IngredientDto>,
    pub steps: Vec<StepDto>,
    /// Latest import that produced this recipe, if it was imported
    pub import: Option<ImportDto>,
    pub recipe_images: Vec<ImageDto>,
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe with ingredients, steps, import and images", body = RecipeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RecipeResponse>> {
    let mut conn = get_conn!(state.pool);

    let recipe = find_owned(&mut conn, user.id, id)?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    let import = latest_import(&mut conn, recipe.id)?;
    let images = load_images(&mut conn, recipe.id)?;
    let full = with_children(&mut conn, recipe)?;

    Ok(Json(RecipeResponse {
        recipe: full.recipe,
        ingredients: full.ingredients,
        steps: full.steps,
        import: import.map(ImportDto::from),
        recipe_images: images
            .into_iter()
            .map(|image| signed(&state, image, None))
            .collect(),
    }))
}
