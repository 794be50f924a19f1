//! Recipe queries shared by the HTTP handlers and the import pipeline.
//!
//! Every lookup that starts from a client-supplied id goes through
//! [`find_owned`], so rows of other users are indistinguishable from missing
//! ones.

use diesel::prelude::*;
use uuid::Uuid;

use crate::models::{
    NewRecipeImage, NewRecipeIngredient, NewRecipeStep, Recipe, RecipeImage, RecipeImport,
    RecipeIngredient, RecipeStep,
};
use crate::schema::{recipe_images, recipe_imports, recipe_ingredients, recipe_steps, recipes};
use crate::types::{IngredientDto, RecipeDto, RecipeWithChildren, StepDto};

/// Ingredient fields in final order; the index becomes the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientFields {
    pub raw_text: String,
    pub normalized_name: String,
}

pub fn find_owned(
    conn: &mut PgConnection,
    user_id: Uuid,
    recipe_id: Uuid,
) -> QueryResult<Option<Recipe>> {
    recipes::table
        .filter(recipes::id.eq(recipe_id))
        .filter(recipes::user_id.eq(user_id))
        .select(Recipe::as_select())
        .first(conn)
        .optional()
}

pub fn load_ingredients(
    conn: &mut PgConnection,
    recipe_id: Uuid,
) -> QueryResult<Vec<RecipeIngredient>> {
    recipe_ingredients::table
        .filter(recipe_ingredients::recipe_id.eq(recipe_id))
        .order(recipe_ingredients::position.asc())
        .select(RecipeIngredient::as_select())
        .load(conn)
}

pub fn load_steps(conn: &mut PgConnection, recipe_id: Uuid) -> QueryResult<Vec<RecipeStep>> {
    recipe_steps::table
        .filter(recipe_steps::recipe_id.eq(recipe_id))
        .order(recipe_steps::position.asc())
        .select(RecipeStep::as_select())
        .load(conn)
}

pub fn load_images(conn: &mut PgConnection, recipe_id: Uuid) -> QueryResult<Vec<RecipeImage>> {
    recipe_images::table
        .filter(recipe_images::recipe_id.eq(recipe_id))
        .order((recipe_images::position.asc(), recipe_images::created_at.asc()))
        .select(RecipeImage::as_select())
        .load(conn)
}

/// The most recent import that produced this recipe, if any.
pub fn latest_import(
    conn: &mut PgConnection,
    recipe_id: Uuid,
) -> QueryResult<Option<RecipeImport>> {
    recipe_imports::table
        .filter(recipe_imports::recipe_id.eq(recipe_id))
        .order(recipe_imports::created_at.desc())
        .select(RecipeImport::as_select())
        .first(conn)
        .optional()
}

pub fn with_children(conn: &mut PgConnection, recipe: Recipe) -> QueryResult<RecipeWithChildren> {
    let ingredients = load_ingredients(conn, recipe.id)?;
    let steps = load_steps(conn, recipe.id)?;

    Ok(RecipeWithChildren {
        recipe: RecipeDto::from(recipe),
        ingredients: ingredients.into_iter().map(IngredientDto::from).collect(),
        steps: steps.into_iter().map(StepDto::from).collect(),
    })
}

/// Replace all ingredients of a recipe. Call inside a transaction.
pub fn replace_ingredients(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    ingredients: &[IngredientFields],
) -> QueryResult<()> {
    diesel::delete(recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)))
        .execute(conn)?;

    let rows: Vec<NewRecipeIngredient> = ingredients
        .iter()
        .enumerate()
        .map(|(position, i)| NewRecipeIngredient {
            recipe_id,
            raw_text: &i.raw_text,
            normalized_name: &i.normalized_name,
            position: position as i32,
        })
        .collect();

    if !rows.is_empty() {
        diesel::insert_into(recipe_ingredients::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

/// Replace all steps of a recipe. Call inside a transaction.
pub fn replace_steps(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    steps: &[String],
) -> QueryResult<()> {
    diesel::delete(recipe_steps::table.filter(recipe_steps::recipe_id.eq(recipe_id)))
        .execute(conn)?;

    let rows: Vec<NewRecipeStep> = steps
        .iter()
        .enumerate()
        .map(|(position, text)| NewRecipeStep {
            recipe_id,
            step_text: text,
            position: position as i32,
        })
        .collect();

    if !rows.is_empty() {
        diesel::insert_into(recipe_steps::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

/// Append an image row after the current last position.
pub fn append_image(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    storage_path: &str,
) -> QueryResult<RecipeImage> {
    let max_position: Option<i32> = recipe_images::table
        .filter(recipe_images::recipe_id.eq(recipe_id))
        .select(diesel::dsl::max(recipe_images::position))
        .first(conn)?;

    diesel::insert_into(recipe_images::table)
        .values(&NewRecipeImage {
            recipe_id,
            storage_path,
            position: max_position.map(|p| p + 1).unwrap_or(0),
        })
        .returning(RecipeImage::as_returning())
        .get_result(conn)
}
