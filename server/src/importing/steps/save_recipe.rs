//! Server SaveRecipe step - writes the extraction into the placeholder recipe.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use cookbook_core::pipeline::steps::{ExtractRecipeStep, FetchImagesStepMeta, SaveRecipeStepMeta};
use cookbook_core::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use cookbook_core::{ExtractRecipeOutput, ExtractedRecipe, RecipeStatus, SaveRecipeOutput};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::recipes::{replace_ingredients, replace_steps, IngredientFields};
use crate::schema::recipes;

pub struct SaveRecipeStep {
    pool: Arc<DbPool>,
    recipe_id: Uuid,
}

impl SaveRecipeStep {
    pub fn new(pool: Arc<DbPool>, recipe_id: Uuid) -> Self {
        Self { pool, recipe_id }
    }

    /// Everything happens in one transaction, so a failure leaves the recipe
    /// without ingredients or steps.
    fn save(&self, recipe: &ExtractedRecipe) -> Result<SaveRecipeOutput, String> {
        let mut conn = self.pool.get().map_err(|e| e.to_string())?;

        let ingredients: Vec<IngredientFields> = recipe
            .ingredients
            .iter()
            .map(|i| IngredientFields {
                raw_text: i.raw_text.clone(),
                normalized_name: i.normalized_name.clone(),
            })
            .collect();
        let steps: Vec<String> = recipe.steps.iter().map(|s| s.step_text.clone()).collect();

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let updated = diesel::update(recipes::table.find(self.recipe_id))
                .set((
                    recipes::title.eq(&recipe.title),
                    recipes::cook_time_minutes.eq(recipe.cook_time_minutes),
                    recipes::prep_time_minutes.eq(recipe.prep_time_minutes),
                    recipes::status.eq(RecipeStatus::Succeeded.as_str()),
                    recipes::error_message.eq(None::<String>),
                    recipes::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(diesel::result::Error::NotFound);
            }

            replace_ingredients(conn, self.recipe_id, &ingredients)?;
            replace_steps(conn, self.recipe_id, &steps)?;
            Ok(())
        })
        .map_err(|e| match e {
            diesel::result::Error::NotFound => "Recipe no longer exists".to_string(),
            other => format!("Failed to save recipe: {}", other),
        })?;

        Ok(SaveRecipeOutput {
            ingredient_count: ingredients.len(),
            step_count: steps.len(),
        })
    }
}

#[async_trait]
impl PipelineStep for SaveRecipeStep {
    fn metadata(&self) -> StepMetadata {
        SaveRecipeStepMeta::metadata()
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let extracted: ExtractRecipeOutput = match ctx.output(ExtractRecipeStep::NAME) {
            Ok(o) => o,
            Err(e) => return StepResult::failure(SaveRecipeStepMeta::NAME, e, start),
        };

        match self.save(&extracted.recipe) {
            Ok(output) => {
                tracing::info!(
                    recipe_id = %self.recipe_id,
                    ingredients = output.ingredient_count,
                    steps = output.step_count,
                    "saved imported recipe"
                );
                StepResult::from_output(
                    SaveRecipeStepMeta::NAME,
                    &output,
                    Some(FetchImagesStepMeta::NAME),
                    start,
                )
            }
            Err(e) => StepResult::failure(SaveRecipeStepMeta::NAME, e, start),
        }
    }
}
