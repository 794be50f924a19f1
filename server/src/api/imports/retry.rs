use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::get_conn;
use crate::importing::{spawn_import, MAX_ATTEMPTS};
use crate::models::RecipeImport;
use crate::schema::{recipe_imports, recipes};
use crate::state::AppState;
use crate::types::{parse_status, ImportDto};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use cookbook_core::RecipeStatus;
use diesel::prelude::*;
use uuid::Uuid;

/// Why an import cannot be retried, if it cannot.
///
/// `recipe_status` is the current status of the linked recipe, `None` when the
/// recipe is gone. Only a failed recipe has no saved content to lose.
fn retry_blocker(
    import: &RecipeImport,
    recipe_status: Option<RecipeStatus>,
) -> Option<&'static str> {
    if parse_status(&import.status) != RecipeStatus::Failed {
        Some("Only failed imports can be retried")
    } else if recipe_status.is_none() {
        Some("The recipe for this import was deleted")
    } else if recipe_status != Some(RecipeStatus::Failed) {
        Some("The recipe for this import has already been saved")
    } else if import.attempt_count >= MAX_ATTEMPTS {
        Some("Import retry limit reached")
    } else {
        None
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes/imports/{id}/retry",
    tag = "imports",
    params(
        ("id" = Uuid, Path, description = "Import ID")
    ),
    responses(
        (status = 202, description = "Import restarted", body = ImportDto),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Import not found", body = ErrorResponse),
        (status = 409, description = "Import cannot be retried", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn retry_import(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<ImportDto>)> {
    let mut conn = get_conn!(state.pool);

    let import = conn.transaction(|conn| {
        let import: RecipeImport = recipe_imports::table
            .filter(recipe_imports::id.eq(id))
            .filter(recipe_imports::user_id.eq(user.id))
            .select(RecipeImport::as_select())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Import not found"))?;

        let recipe_status = match import.recipe_id {
            Some(recipe_id) => recipes::table
                .find(recipe_id)
                .select(recipes::status)
                .for_update()
                .first::<String>(conn)
                .optional()?
                .map(|s| parse_status(&s)),
            None => None,
        };

        if let Some(reason) = retry_blocker(&import, recipe_status) {
            return Err(ApiError::conflict(reason));
        }

        let now = Utc::now();
        let processing = RecipeStatus::Processing.as_str();

        diesel::update(
            recipes::table
                .filter(recipes::id.nullable().eq(import.recipe_id))
                .filter(recipes::status.eq(RecipeStatus::Failed.as_str())),
        )
        .set((
            recipes::status.eq(processing),
            recipes::error_message.eq(None::<String>),
            recipes::updated_at.eq(now),
        ))
        .execute(conn)?;

        let import: RecipeImport =
            diesel::update(recipe_imports::table.filter(recipe_imports::id.eq(import.id)))
                .set((
                    recipe_imports::status.eq(processing),
                    recipe_imports::error_code.eq(None::<String>),
                    recipe_imports::error_message.eq(None::<String>),
                    recipe_imports::updated_at.eq(now),
                ))
                .returning(RecipeImport::as_returning())
                .get_result(conn)?;

        Ok::<_, ApiError>(import)
    })?;
    drop(conn);

    tracing::info!(
        import_id = %import.id,
        attempt = import.attempt_count + 1,
        "retrying recipe import"
    );
    spawn_import(state.clone(), import.id);

    Ok((StatusCode::ACCEPTED, Json(ImportDto::from(import))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(status: &str, recipe_id: Option<Uuid>, attempt_count: i32) -> RecipeImport {
        RecipeImport {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            recipe_id,
            source_url: "https://example.com/soup".to_string(),
            status: status.to_string(),
            attempt_count,
            error_code: Some("fetch_failed".to_string()),
            error_message: Some("HTTP 500".to_string()),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    const FAILED: Option<RecipeStatus> = Some(RecipeStatus::Failed);

    #[test]
    fn test_failed_linked_import_can_retry() {
        assert_eq!(retry_blocker(&import("failed", Some(Uuid::new_v4()), 1), FAILED), None);
        assert_eq!(retry_blocker(&import("failed", Some(Uuid::new_v4()), 4), FAILED), None);
    }

    #[test]
    fn test_retry_blockers() {
        assert_eq!(
            retry_blocker(&import("processing", Some(Uuid::new_v4()), 1), FAILED),
            Some("Only failed imports can be retried")
        );
        assert_eq!(
            retry_blocker(&import("succeeded", Some(Uuid::new_v4()), 1), FAILED),
            Some("Only failed imports can be retried")
        );
        assert_eq!(
            retry_blocker(&import("failed", None, 1), None),
            Some("The recipe for this import was deleted")
        );
        assert_eq!(
            retry_blocker(&import("failed", Some(Uuid::new_v4()), 5), FAILED),
            Some("Import retry limit reached")
        );
    }

    #[test]
    fn test_failed_import_of_saved_recipe_cannot_retry() {
        let failed_import = import("failed", Some(Uuid::new_v4()), 1);
        assert_eq!(
            retry_blocker(&failed_import, Some(RecipeStatus::Succeeded)),
            Some("The recipe for this import has already been saved")
        );
        assert_eq!(
            retry_blocker(&failed_import, Some(RecipeStatus::Processing)),
            Some("The recipe for this import has already been saved")
        );
        assert_eq!(
            retry_blocker(&failed_import, None),
            Some("The recipe for this import was deleted")
        );
    }
}
