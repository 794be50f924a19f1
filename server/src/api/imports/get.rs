use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::RecipeImport;
use crate::schema::recipe_imports;
use crate::types::ImportDto;
use axum::{
    extract::{Path, State},
    Json,
};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/recipes/imports/{id}",
    tag = "imports",
    params(
        ("id" = Uuid, Path, description = "Import ID")
    ),
    responses(
        (status = 200, description = "Import status and metadata", body = ImportDto),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Import not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_import(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ImportDto>> {
    let mut conn = get_conn!(pool);

    let import: RecipeImport = recipe_imports::table
        .filter(recipe_imports::id.eq(id))
        .filter(recipe_imports::user_id.eq(user.id))
        .select(RecipeImport::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found("Import not found"))?;

    Ok(Json(ImportDto::from(import)))
}
