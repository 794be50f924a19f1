//! Recipe import orchestration.
//!
//! An import runs as a detached task: it bumps the attempt counter, runs the
//! step pipeline against the placeholder recipe, then records the outcome on
//! the import row (and on the recipe when it failed). Nothing here may take
//! the server down; errors while recording are logged and dropped.

pub mod steps;

use std::time::Instant;

use chrono::Utc;
use cookbook_core::pipeline::steps::{
    ExtractRecipeStep, FetchHtmlStep, FetchImagesStepMeta, SanitizeHtmlStep, SaveRecipeStepMeta,
};
use cookbook_core::pipeline::{
    first_fatal_failure, run_pipeline, MemoryOutputStore, StepOutputStore, StepRegistry,
    StepResult,
};
use cookbook_core::{
    ExtractRecipeOutput, FetchImagesOutput, ImportErrorCode, RecipeStatus, SanitizeHtmlOutput,
};
use diesel::prelude::*;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::RecipeImport;
use crate::schema::{recipe_imports, recipes};
use crate::state::AppState;
use steps::{FetchImagesStep, SaveRecipeStep};

/// Title of the placeholder recipe created when an import is submitted.
pub const PLACEHOLDER_TITLE: &str = "Importing recipe";

/// Maximum pipeline runs per import, retries included.
pub const MAX_ATTEMPTS: i32 = 5;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Import not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Database connection failed: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

/// Final state of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub status: RecipeStatus,
    pub error_code: Option<ImportErrorCode>,
    pub error_message: Option<String>,
    pub metadata: JsonValue,
}

/// Run an import in the background.
pub fn spawn_import(state: AppState, import_id: Uuid) {
    tokio::spawn(
        run_import(state, import_id)
            .instrument(tracing::info_span!("recipe_import", import_id = %import_id)),
    );
}

pub async fn run_import(state: AppState, import_id: Uuid) {
    if let Err(e) = try_run_import(&state, import_id).await {
        tracing::error!("Failed to record import outcome: {}", e);
        if let Err(e) = settle_after_error(&state.pool, import_id) {
            tracing::error!("Import left in processing until restart: {}", e);
        }
    }
}

async fn try_run_import(state: &AppState, import_id: Uuid) -> Result<(), ImportError> {
    let started = Instant::now();
    let import = begin_attempt(&state.pool, import_id)?;

    let Some(recipe_id) = import.recipe_id else {
        tracing::warn!("import has no recipe to fill, giving up");
        let outcome = ImportOutcome {
            status: RecipeStatus::Failed,
            error_code: Some(ImportErrorCode::PersistFailed),
            error_message: Some("Recipe was deleted".to_string()),
            metadata: json!({}),
        };
        return record_outcome(&state.pool, &import, &outcome);
    };

    tracing::info!(
        url = %import.source_url,
        attempt = import.attempt_count,
        "starting recipe import"
    );

    let registry = build_registry(state, import.user_id, recipe_id);
    let mut store = MemoryOutputStore::new();
    let results = run_pipeline(
        FetchHtmlStep::NAME,
        &import.source_url,
        &mut store,
        &registry,
    )
    .await;

    let fatal = first_fatal_failure(&results, &registry);
    let outcome = build_outcome(&results, fatal, &store);
    record_outcome(&state.pool, &import, &outcome)?;

    match outcome.status {
        RecipeStatus::Succeeded => tracing::info!(
            recipe_id = %recipe_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "recipe import succeeded"
        ),
        _ => tracing::warn!(
            recipe_id = %recipe_id,
            error_code = outcome.error_code.map(|c| c.as_str()).unwrap_or("unknown"),
            error = outcome.error_message.as_deref().unwrap_or(""),
            "recipe import failed"
        ),
    }
    Ok(())
}

/// All five import steps; the DB-backed ones write into `recipe_id`.
pub fn build_registry(state: &AppState, user_id: Uuid, recipe_id: Uuid) -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry.register(Box::new(FetchHtmlStep::new(state.http.clone())));
    registry.register(Box::new(SanitizeHtmlStep));
    registry.register(Box::new(ExtractRecipeStep::new(state.llm.clone())));
    registry.register(Box::new(SaveRecipeStep::new(state.pool.clone(), recipe_id)));
    registry.register(Box::new(FetchImagesStep::new(
        state.clone(),
        user_id,
        recipe_id,
    )));
    registry
}

/// Count the attempt and put the import back into `processing`.
fn begin_attempt(pool: &DbPool, import_id: Uuid) -> Result<RecipeImport, ImportError> {
    let mut conn = pool.get()?;

    diesel::update(recipe_imports::table.find(import_id))
        .set((
            recipe_imports::attempt_count.eq(recipe_imports::attempt_count + 1),
            recipe_imports::status.eq(RecipeStatus::Processing.as_str()),
            recipe_imports::error_code.eq(None::<String>),
            recipe_imports::error_message.eq(None::<String>),
            recipe_imports::updated_at.eq(Utc::now()),
        ))
        .returning(RecipeImport::as_returning())
        .get_result(&mut conn)
        .optional()?
        .ok_or(ImportError::NotFound(import_id))
}

/// Derive status, error and metadata from a finished run.
pub fn build_outcome(
    results: &[StepResult],
    fatal: Option<&StepResult>,
    store: &dyn StepOutputStore,
) -> ImportOutcome {
    let metadata = build_metadata(results, store);

    if let Some(failure) = fatal {
        return ImportOutcome {
            status: RecipeStatus::Failed,
            error_code: Some(ImportErrorCode::for_step(&failure.step_name)),
            error_message: Some(
                failure
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
            metadata,
        };
    }

    let saved = results
        .iter()
        .any(|r| r.step_name == SaveRecipeStepMeta::NAME && r.success);
    if !saved {
        return ImportOutcome {
            status: RecipeStatus::Failed,
            error_code: Some(ImportErrorCode::PersistFailed),
            error_message: Some("Import stopped before the recipe was saved".to_string()),
            metadata,
        };
    }

    ImportOutcome {
        status: RecipeStatus::Succeeded,
        error_code: None,
        error_message: None,
        metadata,
    }
}

fn build_metadata(results: &[StepResult], store: &dyn StepOutputStore) -> JsonValue {
    let steps: Vec<JsonValue> = results
        .iter()
        .map(|r| {
            json!({
                "name": r.step_name,
                "success": r.success,
                "duration_ms": r.duration_ms,
                "error": r.error,
            })
        })
        .collect();

    let mut metadata = json!({ "steps": steps });

    if let Some(sanitized) = output::<SanitizeHtmlOutput>(store, SanitizeHtmlStep::NAME) {
        metadata["html_length"] = json!(sanitized.original_len);
        metadata["content_length"] = json!(sanitized.content.len());
    }
    if let Some(extracted) = output::<ExtractRecipeOutput>(store, ExtractRecipeStep::NAME) {
        metadata["model"] = json!(extracted.model);
        metadata["usage"] = json!(extracted.usage);
        metadata["image_urls"] = json!(extracted.recipe.images);
    }
    if let Some(images) = output::<FetchImagesOutput>(store, FetchImagesStepMeta::NAME) {
        metadata["stored_image_ids"] = json!(images.image_ids);
        metadata["failed_images"] = json!(images.failed_urls);
    }

    metadata
}

fn output<T: serde::de::DeserializeOwned>(store: &dyn StepOutputStore, step: &str) -> Option<T> {
    store
        .get_output(step)
        .and_then(|v| serde_json::from_value(v).ok())
}

/// Write the outcome to the import row and, on failure, to the recipe.
fn record_outcome(
    pool: &DbPool,
    import: &RecipeImport,
    outcome: &ImportOutcome,
) -> Result<(), ImportError> {
    let mut conn = pool.get()?;
    let now = Utc::now();

    conn.transaction::<_, ImportError, _>(|conn| {
        diesel::update(recipe_imports::table.find(import.id))
            .set((
                recipe_imports::status.eq(outcome.status.as_str()),
                recipe_imports::error_code.eq(outcome.error_code.map(|c| c.as_str())),
                recipe_imports::error_message.eq(outcome.error_message.as_deref()),
                recipe_imports::metadata.eq(&outcome.metadata),
                recipe_imports::updated_at.eq(now),
            ))
            .execute(conn)?;

        if outcome.status == RecipeStatus::Failed {
            if let Some(recipe_id) = import.recipe_id {
                diesel::update(recipes::table.find(recipe_id))
                    .set((
                        recipes::status.eq(RecipeStatus::Failed.as_str()),
                        recipes::error_message.eq(outcome.error_message.as_deref()),
                        recipes::updated_at.eq(now),
                    ))
                    .execute(conn)?;
            }
        }
        Ok(())
    })
}

/// What to do with imports stuck in `processing`.
#[derive(Debug, Default, PartialEq)]
pub struct Settlement {
    /// Imports whose recipe was already saved.
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<Uuid>,
    /// Placeholder recipes that never got saved.
    pub failed_recipes: Vec<Uuid>,
}

/// Sort stuck imports by the status of their recipe.
///
/// The save step commits before images are harvested, so a run can die with
/// a `succeeded` recipe; its import is settled as succeeded and the recipe is
/// left alone. Only recipes still in `processing` are failed.
pub fn plan_settlement(stuck: &[(Uuid, Option<Uuid>, Option<String>)]) -> Settlement {
    let mut plan = Settlement::default();
    for (import_id, recipe_id, recipe_status) in stuck {
        let recipe_status = recipe_status.as_deref().and_then(RecipeStatus::parse);
        if recipe_status == Some(RecipeStatus::Succeeded) {
            plan.succeeded.push(*import_id);
            continue;
        }
        plan.failed.push(*import_id);
        if let (Some(recipe_id), Some(RecipeStatus::Processing)) = (recipe_id, recipe_status) {
            plan.failed_recipes.push(*recipe_id);
        }
    }
    plan
}

/// Close out `processing` imports (all of them, or just `only`).
fn settle_stuck_imports(
    conn: &mut PgConnection,
    only: Option<Uuid>,
    message: &str,
) -> Result<usize, ImportError> {
    let now = Utc::now();

    conn.transaction::<_, ImportError, _>(|conn| {
        let mut query = recipe_imports::table
            .left_join(recipes::table)
            .filter(recipe_imports::status.eq(RecipeStatus::Processing.as_str()))
            .select((
                recipe_imports::id,
                recipe_imports::recipe_id,
                recipes::status.nullable(),
            ))
            .into_boxed();
        if let Some(id) = only {
            query = query.filter(recipe_imports::id.eq(id));
        }
        let stuck: Vec<(Uuid, Option<Uuid>, Option<String>)> = query.load(conn)?;
        let plan = plan_settlement(&stuck);

        if !plan.succeeded.is_empty() {
            diesel::update(recipe_imports::table.filter(recipe_imports::id.eq_any(&plan.succeeded)))
                .set((
                    recipe_imports::status.eq(RecipeStatus::Succeeded.as_str()),
                    recipe_imports::error_code.eq(None::<String>),
                    recipe_imports::error_message.eq(None::<String>),
                    recipe_imports::updated_at.eq(now),
                ))
                .execute(conn)?;
        }

        if !plan.failed.is_empty() {
            diesel::update(recipe_imports::table.filter(recipe_imports::id.eq_any(&plan.failed)))
                .set((
                    recipe_imports::status.eq(RecipeStatus::Failed.as_str()),
                    recipe_imports::error_code.eq(ImportErrorCode::PersistFailed.as_str()),
                    recipe_imports::error_message.eq(message),
                    recipe_imports::updated_at.eq(now),
                ))
                .execute(conn)?;
        }

        if !plan.failed_recipes.is_empty() {
            diesel::update(
                recipes::table
                    .filter(recipes::id.eq_any(&plan.failed_recipes))
                    .filter(recipes::status.eq(RecipeStatus::Processing.as_str())),
            )
            .set((
                recipes::status.eq(RecipeStatus::Failed.as_str()),
                recipes::error_message.eq(message),
                recipes::updated_at.eq(now),
            ))
            .execute(conn)?;
        }

        Ok(stuck.len())
    })
}

/// Settle imports left in `processing` by a previous server process so they
/// can be retried.
pub fn fail_interrupted_imports(pool: &DbPool) -> Result<usize, ImportError> {
    let mut conn = pool.get()?;
    settle_stuck_imports(&mut conn, None, "Import interrupted by a server restart")
}

/// Last attempt to take an import out of `processing` after recording failed.
fn settle_after_error(pool: &DbPool, import_id: Uuid) -> Result<usize, ImportError> {
    let mut conn = pool.get()?;
    settle_stuck_imports(
        &mut conn,
        Some(import_id),
        "Import failed while saving its result",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(step: &str, output: JsonValue) -> StepResult {
        StepResult::success(step, output, None, Instant::now())
    }

    fn failed(step: &str, error: &str) -> StepResult {
        StepResult::failure(step, error, Instant::now())
    }

    fn extraction() -> JsonValue {
        json!({
            "recipe": {
                "title": "Soup",
                "cook_time_minutes": 10,
                "prep_time_minutes": null,
                "ingredients": [{"raw_text": "1 leek", "normalized_name": "leek"}],
                "steps": [{"step_text": "Boil."}],
                "images": ["https://img.test/a.jpg", "https://img.test/b.jpg"]
            },
            "model": "test-model",
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })
    }

    #[test]
    fn test_successful_run_records_metadata() {
        let image_id = Uuid::new_v4();
        let images = json!({
            "image_ids": [image_id],
            "failed_urls": [{"url": "https://img.test/b.jpg", "error": "HTTP 404"}]
        });
        let store = MemoryOutputStore::new()
            .with_output(
                SanitizeHtmlStep::NAME,
                json!({"content": "Soup", "original_len": 120}),
            )
            .with_output(ExtractRecipeStep::NAME, extraction())
            .with_output(FetchImagesStepMeta::NAME, images.clone());
        let results = vec![
            ok(FetchHtmlStep::NAME, json!({})),
            ok(SanitizeHtmlStep::NAME, json!({})),
            ok(ExtractRecipeStep::NAME, extraction()),
            ok(SaveRecipeStepMeta::NAME, json!({})),
            ok(FetchImagesStepMeta::NAME, images),
        ];

        let outcome = build_outcome(&results, None, &store);

        assert_eq!(outcome.status, RecipeStatus::Succeeded);
        assert_eq!(outcome.error_code, None);
        let m = &outcome.metadata;
        assert_eq!(m["model"], "test-model");
        assert_eq!(m["usage"]["total_tokens"], 15);
        assert_eq!(m["html_length"], 120);
        assert_eq!(m["content_length"], 4);
        assert_eq!(m["image_urls"].as_array().unwrap().len(), 2);
        assert_eq!(m["stored_image_ids"][0], image_id.to_string());
        assert_eq!(m["failed_images"][0]["error"], "HTTP 404");
        assert_eq!(m["steps"].as_array().unwrap().len(), 5);
        assert_eq!(m["steps"][3]["name"], SaveRecipeStepMeta::NAME);
    }

    #[test]
    fn test_fatal_failure_sets_code_and_message() {
        let results = vec![failed(FetchHtmlStep::NAME, "HTTP 503 fetching page")];
        let outcome = build_outcome(&results, results.first(), &MemoryOutputStore::new());

        assert_eq!(outcome.status, RecipeStatus::Failed);
        assert_eq!(outcome.error_code, Some(ImportErrorCode::FetchFailed));
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("HTTP 503 fetching page")
        );
        assert_eq!(outcome.metadata["steps"][0]["success"], false);
        assert!(outcome.metadata.get("model").is_none());
    }

    #[test]
    fn test_extraction_and_persist_codes() {
        let results = vec![
            ok(FetchHtmlStep::NAME, json!({})),
            ok(SanitizeHtmlStep::NAME, json!({})),
            failed(
                ExtractRecipeStep::NAME,
                "The AI returned an invalid data format. Please try again.",
            ),
        ];
        let outcome = build_outcome(&results, results.last(), &MemoryOutputStore::new());
        assert_eq!(outcome.error_code, Some(ImportErrorCode::ExtractionFailed));

        let results = vec![failed(SaveRecipeStepMeta::NAME, "Recipe no longer exists")];
        let outcome = build_outcome(&results, results.first(), &MemoryOutputStore::new());
        assert_eq!(outcome.error_code, Some(ImportErrorCode::PersistFailed));
    }

    #[test]
    fn test_run_that_never_saved_is_a_failure() {
        let results = vec![
            ok(FetchHtmlStep::NAME, json!({})),
            ok(SanitizeHtmlStep::NAME, json!({})),
        ];
        let outcome = build_outcome(&results, None, &MemoryOutputStore::new());

        assert_eq!(outcome.status, RecipeStatus::Failed);
        assert_eq!(outcome.error_code, Some(ImportErrorCode::PersistFailed));
    }

    #[test]
    fn test_settlement_keeps_saved_recipes_succeeded() {
        let saved_import = Uuid::new_v4();
        let saved_recipe = Uuid::new_v4();
        let plan = plan_settlement(&[(
            saved_import,
            Some(saved_recipe),
            Some("succeeded".to_string()),
        )]);

        assert_eq!(plan.succeeded, vec![saved_import]);
        assert!(plan.failed.is_empty());
        assert!(plan.failed_recipes.is_empty());
    }

    #[test]
    fn test_settlement_fails_unsaved_placeholders() {
        let running = (Uuid::new_v4(), Uuid::new_v4());
        let orphan = Uuid::new_v4();
        let plan = plan_settlement(&[
            (running.0, Some(running.1), Some("processing".to_string())),
            (orphan, None, None),
        ]);

        assert!(plan.succeeded.is_empty());
        assert_eq!(plan.failed, vec![running.0, orphan]);
        assert_eq!(plan.failed_recipes, vec![running.1]);
    }

    #[test]
    fn test_settlement_never_touches_failed_recipes() {
        let import_id = Uuid::new_v4();
        let plan = plan_settlement(&[(
            import_id,
            Some(Uuid::new_v4()),
            Some("failed".to_string()),
        )]);

        assert_eq!(plan.failed, vec![import_id]);
        assert!(plan.failed_recipes.is_empty());
    }
}
