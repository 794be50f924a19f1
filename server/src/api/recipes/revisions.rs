use crate::api::pagination::Page;
use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::RecipeRevision;
use crate::recipes::find_owned;
use crate::schema::recipe_revisions;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRevisionsParams {
    /// Number of items to return (default: 50, max: 200)
    pub limit: Option<i64>,
    /// Opaque cursor from a previous page's next_cursor
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevisionDto {
    pub id: Uuid,
    pub recipe_id: Uuid,
    /// Changed fields, each as `{"before": ..., "after": ...}`
    #[schema(value_type = Object)]
    pub changes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<RecipeRevision> for RevisionDto {
    fn from(r: RecipeRevision) -> Self {
        Self {
            id: r.id,
            recipe_id: r.recipe_id,
            changes: r.changes,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRevisionsResponse {
    pub data: Vec<RevisionDto>,
    pub next_cursor: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/revisions",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID"),
        ListRevisionsParams
    ),
    responses(
        (status = 200, description = "Revisions, newest first", body = ListRevisionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_revisions(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListRevisionsParams>,
) -> ApiResult<Json<ListRevisionsResponse>> {
    let page = Page::from_params(params.limit, params.cursor.as_deref())?;
    let mut conn = get_conn!(pool);

    let recipe =
        find_owned(&mut conn, user.id, id)?.ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    let mut rows: Vec<RecipeRevision> = recipe_revisions::table
        .filter(recipe_revisions::recipe_id.eq(recipe.id))
        .order((
            recipe_revisions::created_at.desc(),
            recipe_revisions::id.desc(),
        ))
        .offset(page.offset)
        .limit(page.fetch())
        .select(RecipeRevision::as_select())
        .load(&mut conn)?;
    let next_cursor = page.finish(&mut rows);

    Ok(Json(ListRevisionsResponse {
        data: rows.into_iter().map(RevisionDto::from).collect(),
        next_cursor,
    }))
}
