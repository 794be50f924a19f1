use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewRecipe, Recipe};
use crate::recipes::{replace_ingredients, replace_steps, with_children};
use crate::schema::recipes;
use crate::types::RecipeWithChildren;
use axum::{extract::State, http::StatusCode, Json};
use cookbook_core::RecipeStatus;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::payload::{self, IngredientInput, StepInput};

pub const DUPLICATE_SOURCE_URL: &str = "Recipe source_url already exists.";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub cook_time_minutes: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub source_url: Option<String>,
    pub ingredients: Vec<IngredientInput>,
    pub steps: Vec<StepInput>,
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created successfully", body = RecipeWithChildren),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "A recipe with this source_url already exists", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(request): Json<CreateRecipeRequest>,
) -> ApiResult<(StatusCode, Json<RecipeWithChildren>)> {
    let title = payload::title(&request.title)?;
    let cook_time_minutes = payload::minutes("cook_time_minutes", request.cook_time_minutes)?;
    let prep_time_minutes = payload::minutes("prep_time_minutes", request.prep_time_minutes)?;
    let source_url = payload::source_url(request.source_url.as_deref())?;
    let ingredients = payload::ingredients(request.ingredients)?;
    let steps = payload::steps(request.steps)?;

    let mut conn = get_conn!(pool);

    let created = conn.transaction(|conn| {
        let recipe: Recipe = diesel::insert_into(recipes::table)
            .values(&NewRecipe {
                user_id: user.id,
                title: &title,
                cook_time_minutes,
                prep_time_minutes,
                source_url: source_url.as_deref(),
                status: RecipeStatus::Succeeded.as_str(),
            })
            .returning(Recipe::as_returning())
            .get_result(conn)
            .map_err(ApiError::unique_violation(DUPLICATE_SOURCE_URL))?;

        replace_ingredients(conn, recipe.id, &ingredients)?;
        replace_steps(conn, recipe.id, &steps)?;

        Ok::<_, ApiError>(with_children(conn, recipe)?)
    })?;

    tracing::info!(recipe_id = %created.recipe.id, "created recipe");

    Ok((StatusCode::CREATED, Json(created)))
}
