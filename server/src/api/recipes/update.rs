use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewRecipeRevision, Recipe};
use crate::recipes::{
    load_ingredients, load_steps, replace_ingredients, replace_steps, with_children,
    IngredientFields,
};
use crate::schema::{recipe_revisions, recipes};
use crate::types::{parse_status, RecipeWithChildren};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use cookbook_core::RecipeStatus;
use diesel::prelude::*;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value as JsonValue};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::payload::{self, IngredientInput, StepInput};

/// Distinguish an absent field (`None`) from an explicit null (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update. Omitted fields are left alone; `ingredients` and `steps`
/// replace the whole list when present.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    /// Send null to clear
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i32>)]
    pub cook_time_minutes: Option<Option<i32>>,
    /// Send null to clear
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i32>)]
    pub prep_time_minutes: Option<Option<i32>>,
    pub ingredients: Option<Vec<IngredientInput>>,
    pub steps: Option<Vec<StepInput>>,
}

/// The request after validation.
#[derive(Debug, Default, PartialEq)]
struct Changes {
    title: Option<String>,
    cook_time_minutes: Option<Option<i32>>,
    prep_time_minutes: Option<Option<i32>>,
    ingredients: Option<Vec<IngredientFields>>,
    steps: Option<Vec<String>>,
}

impl Changes {
    fn validate(request: UpdateRecipeRequest) -> Result<Self, ApiError> {
        let changes = Changes {
            title: request.title.as_deref().map(payload::title).transpose()?,
            cook_time_minutes: request
                .cook_time_minutes
                .map(|m| payload::minutes("cook_time_minutes", m))
                .transpose()?,
            prep_time_minutes: request
                .prep_time_minutes
                .map(|m| payload::minutes("prep_time_minutes", m))
                .transpose()?,
            ingredients: request.ingredients.map(payload::ingredients).transpose()?,
            steps: request.steps.map(payload::steps).transpose()?,
        };

        if changes == Changes::default() {
            return Err(ApiError::bad_request("No changes provided"));
        }
        Ok(changes)
    }

    fn touches_children(&self) -> bool {
        self.ingredients.is_some() || self.steps.is_some()
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = recipes)]
struct RecipeChangeset<'a> {
    title: Option<&'a str>,
    cook_time_minutes: Option<Option<i32>>,
    prep_time_minutes: Option<Option<i32>>,
    updated_at: chrono::DateTime<Utc>,
}

fn ingredient_list(ingredients: &[IngredientFields]) -> JsonValue {
    ingredients
        .iter()
        .map(|i| json!({"raw_text": i.raw_text, "normalized_name": i.normalized_name}))
        .collect()
}

/// Before/after values for every field the update touches.
fn revision_changes(
    recipe: &Recipe,
    old_ingredients: Option<Vec<IngredientFields>>,
    old_steps: Option<Vec<String>>,
    changes: &Changes,
) -> JsonValue {
    let mut out = Map::new();
    let mut record = |field: &str, before: JsonValue, after: JsonValue| {
        out.insert(field.to_string(), json!({"before": before, "after": after}));
    };

    if let Some(title) = &changes.title {
        record("title", json!(recipe.title), json!(title));
    }
    if let Some(minutes) = changes.cook_time_minutes {
        record("cook_time_minutes", json!(recipe.cook_time_minutes), json!(minutes));
    }
    if let Some(minutes) = changes.prep_time_minutes {
        record("prep_time_minutes", json!(recipe.prep_time_minutes), json!(minutes));
    }
    if let (Some(before), Some(after)) = (old_ingredients, &changes.ingredients) {
        record("ingredients", ingredient_list(&before), ingredient_list(after));
    }
    if let (Some(before), Some(after)) = (old_steps, &changes.steps) {
        record("steps", json!(before), json!(after));
    }

    JsonValue::Object(out)
}

#[utoipa::path(
    put,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = RecipeWithChildren),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 409, description = "Recipe is being imported", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRecipeRequest>,
) -> ApiResult<Json<RecipeWithChildren>> {
    let changes = Changes::validate(request)?;

    let mut conn = get_conn!(pool);

    let updated = conn.transaction(|conn| {
        // Lock the row so an import cannot finish underneath us
        let recipe: Recipe = recipes::table
            .filter(recipes::id.eq(id))
            .filter(recipes::user_id.eq(user.id))
            .select(Recipe::as_select())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

        match parse_status(&recipe.status) {
            RecipeStatus::Processing => {
                return Err(ApiError::conflict("Recipe is still being imported"));
            }
            RecipeStatus::Failed if changes.touches_children() => {
                return Err(ApiError::conflict(
                    "Retry the failed import before editing ingredients or steps",
                ));
            }
            _ => {}
        }

        let old_ingredients = match changes.ingredients {
            Some(_) => Some(
                load_ingredients(conn, recipe.id)?
                    .into_iter()
                    .map(|i| IngredientFields {
                        raw_text: i.raw_text,
                        normalized_name: i.normalized_name,
                    })
                    .collect(),
            ),
            None => None,
        };
        let old_steps = match changes.steps {
            Some(_) => Some(
                load_steps(conn, recipe.id)?
                    .into_iter()
                    .map(|s| s.step_text)
                    .collect(),
            ),
            None => None,
        };

        let revision = revision_changes(&recipe, old_ingredients, old_steps, &changes);

        let recipe: Recipe = diesel::update(recipes::table.filter(recipes::id.eq(recipe.id)))
            .set(&RecipeChangeset {
                title: changes.title.as_deref(),
                cook_time_minutes: changes.cook_time_minutes,
                prep_time_minutes: changes.prep_time_minutes,
                updated_at: Utc::now(),
            })
            .returning(Recipe::as_returning())
            .get_result(conn)?;

        if let Some(ingredients) = &changes.ingredients {
            replace_ingredients(conn, recipe.id, ingredients)?;
        }
        if let Some(steps) = &changes.steps {
            replace_steps(conn, recipe.id, steps)?;
        }

        diesel::insert_into(recipe_revisions::table)
            .values(&NewRecipeRevision {
                recipe_id: recipe.id,
                user_id: user.id,
                changes: revision,
            })
            .execute(conn)?;

        Ok::<_, ApiError>(with_children(conn, recipe)?)
    })?;

    tracing::info!(recipe_id = %id, "updated recipe");

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe() -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Soup".to_string(),
            cook_time_minutes: Some(30),
            prep_time_minutes: None,
            source_url: None,
            status: "succeeded".to_string(),
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_null_and_absent_times_differ() {
        let request: UpdateRecipeRequest =
            serde_json::from_str(r#"{"cook_time_minutes": null}"#).unwrap();
        assert_eq!(request.cook_time_minutes, Some(None));
        assert_eq!(request.prep_time_minutes, None);

        let request: UpdateRecipeRequest =
            serde_json::from_str(r#"{"prep_time_minutes": 15}"#).unwrap();
        assert_eq!(request.prep_time_minutes, Some(Some(15)));
    }

    #[test]
    fn test_empty_update_rejected() {
        let err = Changes::validate(UpdateRecipeRequest::default()).unwrap_err();
        assert_eq!(err.to_string(), "No changes provided");
    }

    #[test]
    fn test_validation_applies_to_present_fields() {
        let request = UpdateRecipeRequest {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(Changes::validate(request).is_err());

        let request = UpdateRecipeRequest {
            cook_time_minutes: Some(Some(-3)),
            ..Default::default()
        };
        assert!(Changes::validate(request).is_err());

        let request = UpdateRecipeRequest {
            steps: Some(vec![]),
            ..Default::default()
        };
        assert!(Changes::validate(request).is_err());
    }

    #[test]
    fn test_revision_records_before_and_after() {
        let changes = Changes {
            title: Some("Tomato soup".to_string()),
            cook_time_minutes: Some(None),
            steps: Some(vec!["Simmer".to_string()]),
            ..Default::default()
        };

        let revision = revision_changes(
            &recipe(),
            None,
            Some(vec!["Boil".to_string()]),
            &changes,
        );

        assert_eq!(
            revision,
            json!({
                "title": {"before": "Soup", "after": "Tomato soup"},
                "cook_time_minutes": {"before": 30, "after": null},
                "steps": {"before": ["Boil"], "after": ["Simmer"]},
            })
        );
    }
}
