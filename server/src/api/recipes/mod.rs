pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod payload;
pub mod revisions;
pub mod update;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::update_recipe)
                .delete(delete::delete_recipe),
        )
        .route("/{id}/revisions", get(revisions::list_revisions))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_recipe,
        list::list_recipes,
        get::get_recipe,
        update::update_recipe,
        delete::delete_recipe,
        revisions::list_revisions,
    ),
    components(schemas(
        payload::IngredientInput,
        payload::StepInput,
        create::CreateRecipeRequest,
        list::ListRecipesResponse,
        list::RecipeSummary,
        get::RecipeResponse,
        update::UpdateRecipeRequest,
        revisions::RevisionDto,
        revisions::ListRevisionsResponse,
    ))
)]
pub struct ApiDoc;
