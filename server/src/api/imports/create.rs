use crate::api::recipes::create::DUPLICATE_SOURCE_URL;
use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::get_conn;
use crate::importing::{spawn_import, PLACEHOLDER_TITLE};
use crate::models::{NewRecipe, NewRecipeImport, Recipe, RecipeImport};
use crate::schema::{recipe_imports, recipes};
use crate::state::AppState;
use crate::types::{ImportDto, RecipeDto};
use axum::{extract::State, http::StatusCode, Json};
use cookbook_core::RecipeStatus;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DUPLICATE_IMPORT: &str = "Recipe import already exists for this URL.";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ImportRecipeRequest {
    pub source_url: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportRecipeResponse {
    /// Placeholder recipe, filled in when the import succeeds
    pub recipe: RecipeDto,
    pub import: ImportDto,
}

#[utoipa::path(
    post,
    path = "/api/recipes/import",
    tag = "imports",
    request_body(
        content = ImportRecipeRequest,
        example = json!({"source_url": "https://example.com/recipes/tomato-soup"})
    ),
    responses(
        (status = 202, description = "Import started", body = ImportRecipeResponse),
        (status = 400, description = "Invalid or disallowed URL", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "URL already imported", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn import_recipe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<ImportRecipeRequest>,
) -> ApiResult<(StatusCode, Json<ImportRecipeResponse>)> {
    let source_url = request.source_url.trim();
    if source_url.is_empty() {
        return Err(ApiError::bad_request("source_url is required"));
    }
    state
        .allowed_hosts()
        .check(source_url)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let mut conn = get_conn!(state.pool);

    let processing = RecipeStatus::Processing.as_str();
    let (recipe, import) = conn.transaction(|conn| {
        let recipe: Recipe = diesel::insert_into(recipes::table)
            .values(&NewRecipe {
                user_id: user.id,
                title: PLACEHOLDER_TITLE,
                cook_time_minutes: None,
                prep_time_minutes: None,
                source_url: Some(source_url),
                status: processing,
            })
            .returning(Recipe::as_returning())
            .get_result(conn)
            .map_err(ApiError::unique_violation(DUPLICATE_SOURCE_URL))?;

        let import: RecipeImport = diesel::insert_into(recipe_imports::table)
            .values(&NewRecipeImport {
                user_id: user.id,
                recipe_id: recipe.id,
                source_url,
                status: processing,
            })
            .returning(RecipeImport::as_returning())
            .get_result(conn)
            .map_err(ApiError::unique_violation(DUPLICATE_IMPORT))?;

        Ok::<_, ApiError>((recipe, import))
    })?;
    drop(conn);

    tracing::info!(
        import_id = %import.id,
        recipe_id = %recipe.id,
        source_url,
        "queued recipe import"
    );
    spawn_import(state.clone(), import.id);

    Ok((
        StatusCode::ACCEPTED,
        Json(ImportRecipeResponse {
            recipe: RecipeDto::from(recipe),
            import: ImportDto::from(import),
        }),
    ))
}
