use crate::api::pagination::Page;
use crate::api::{status_filter, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::RecipeImport;
use crate::schema::recipe_imports;
use crate::types::ImportDto;
use axum::{
    extract::{Query, State},
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListImportsParams {
    /// Only imports with this status (processing, succeeded, failed)
    pub status: Option<String>,
    /// Number of items to return (default: 50, max: 200)
    pub limit: Option<i64>,
    /// Opaque cursor from a previous page's next_cursor
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListImportsResponse {
    pub data: Vec<ImportDto>,
    pub next_cursor: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/recipes/imports",
    tag = "imports",
    params(ListImportsParams),
    responses(
        (status = 200, description = "Imports, newest first", body = ListImportsResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_imports(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListImportsParams>,
) -> ApiResult<Json<ListImportsResponse>> {
    let status = status_filter(params.status.as_deref())?;
    let page = Page::from_params(params.limit, params.cursor.as_deref())?;

    let mut conn = get_conn!(pool);

    let mut query = recipe_imports::table
        .filter(recipe_imports::user_id.eq(user.id))
        .select(RecipeImport::as_select())
        .into_boxed();

    if let Some(status) = status {
        query = query.filter(recipe_imports::status.eq(status.as_str()));
    }

    let mut rows: Vec<RecipeImport> = query
        .order((recipe_imports::created_at.desc(), recipe_imports::id.desc()))
        .offset(page.offset)
        .limit(page.fetch())
        .load(&mut conn)?;
    let next_cursor = page.finish(&mut rows);

    Ok(Json(ListImportsResponse {
        data: rows.into_iter().map(ImportDto::from).collect(),
        next_cursor,
    }))
}
