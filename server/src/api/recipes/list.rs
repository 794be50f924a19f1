use crate::api::pagination::Page;
use crate::api::{status_filter, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Recipe;
use crate::schema::{recipe_ingredients, recipes};
use crate::types::parse_status;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use cookbook_core::RecipeStatus;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRecipesParams {
    /// Only recipes with this status (processing, succeeded, failed)
    pub status: Option<String>,
    /// Keep recipes with an ingredient whose normalized name contains this text
    pub q: Option<String>,
    /// Number of items to return (default: 50, max: 200)
    pub limit: Option<i64>,
    /// Opaque cursor from a previous page's next_cursor
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub title: String,
    #[schema(value_type = String, example = "succeeded")]
    pub status: RecipeStatus,
    pub error_message: Option<String>,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Distinct normalized ingredient names in position order
    pub ingredients_preview: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRecipesResponse {
    pub data: Vec<RecipeSummary>,
    /// Pass as `cursor` to fetch the next page; null on the last page
    pub next_cursor: Option<String>,
}

/// Substring LIKE pattern with the wildcard characters of `needle` escaped.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Group `(recipe_id, normalized_name)` rows, already sorted by position,
/// into per-recipe lists of distinct non-empty names.
fn build_previews(rows: Vec<(Uuid, String)>) -> HashMap<Uuid, Vec<String>> {
    let mut previews: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (recipe_id, name) in rows {
        if name.is_empty() {
            continue;
        }
        let names = previews.entry(recipe_id).or_default();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    previews
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "Recipes, most recently updated first", body = ListRecipesResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListRecipesParams>,
) -> ApiResult<Json<ListRecipesResponse>> {
    let status = status_filter(params.status.as_deref())?;
    let q = params
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let page = Page::from_params(params.limit, params.cursor.as_deref())?;

    let mut conn = get_conn!(pool);

    let mut query = recipes::table
        .filter(recipes::user_id.eq(user.id))
        .select(Recipe::as_select())
        .into_boxed();

    if let Some(status) = status {
        query = query.filter(recipes::status.eq(status.as_str()));
    }

    if let Some(q) = &q {
        let matching = recipe_ingredients::table
            .filter(recipe_ingredients::normalized_name.ilike(like_pattern(q)))
            .select(recipe_ingredients::recipe_id);
        query = query.filter(recipes::id.eq_any(matching));
    }

    let mut rows: Vec<Recipe> = query
        .order((recipes::updated_at.desc(), recipes::id.desc()))
        .offset(page.offset)
        .limit(page.fetch())
        .load(&mut conn)?;
    let next_cursor = page.finish(&mut rows);

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let preview_rows: Vec<(Uuid, String)> = recipe_ingredients::table
        .filter(recipe_ingredients::recipe_id.eq_any(&ids))
        .order((
            recipe_ingredients::recipe_id,
            recipe_ingredients::position.asc(),
        ))
        .select((
            recipe_ingredients::recipe_id,
            recipe_ingredients::normalized_name,
        ))
        .load(&mut conn)?;
    let mut previews = build_previews(preview_rows);

    let data = rows
        .into_iter()
        .map(|r| RecipeSummary {
            ingredients_preview: previews.remove(&r.id).unwrap_or_default(),
            id: r.id,
            title: r.title,
            status: parse_status(&r.status),
            error_message: r.error_message,
            source_url: r.source_url,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
        .collect();

    Ok(Json(ListRecipesResponse { data, next_cursor }))
}
