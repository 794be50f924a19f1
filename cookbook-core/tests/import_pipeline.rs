//! End-to-end runs of the import pipeline with mocked HTTP and LLM.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use cookbook_core::pipeline::steps::{
    ExtractRecipeStep, FetchHtmlStep, FetchImagesStepMeta, SanitizeHtmlStep, SaveRecipeStepMeta,
};
use cookbook_core::pipeline::{
    first_fatal_failure, run_pipeline, MemoryOutputStore, PipelineStep, StepContext,
    StepMetadata, StepOutputStore, StepRegistry, StepResult,
};
use cookbook_core::{
    ExtractRecipeOutput, FakeProvider, ImportErrorCode, MockClient, SaveRecipeOutput,
};

const URL: &str = "https://kitchen.test/recipes/stew";

const ANSWER: &str = r#"{"title": "Beef Stew", "cook_time_minutes": 120, "prep_time_minutes": 20,
    "ingredients": [{"raw_text": "1 kg beef", "normalized_name": "beef"},
                    {"raw_text": "3 carrots", "normalized_name": "carrot"}],
    "steps": [{"step_text": "Brown the beef."}, {"step_text": "Simmer for two hours."}],
    "images": ["/img/stew.jpg"]}"#;

/// Records what would be persisted instead of writing to a database.
struct RecordingSave {
    saved: Arc<Mutex<Option<String>>>,
    fail: bool,
}

#[async_trait]
impl PipelineStep for RecordingSave {
    fn metadata(&self) -> StepMetadata {
        SaveRecipeStepMeta::metadata()
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();
        if self.fail {
            return StepResult::failure(SaveRecipeStepMeta::NAME, "database unavailable", start);
        }
        let extracted: ExtractRecipeOutput = match ctx.output(ExtractRecipeStep::NAME) {
            Ok(o) => o,
            Err(e) => return StepResult::failure(SaveRecipeStepMeta::NAME, e, start),
        };
        *self.saved.lock().unwrap() = Some(extracted.recipe.title.clone());
        StepResult::from_output(
            SaveRecipeStepMeta::NAME,
            &SaveRecipeOutput {
                ingredient_count: extracted.recipe.ingredients.len(),
                step_count: extracted.recipe.steps.len(),
            },
            Some(FetchImagesStepMeta::NAME),
            start,
        )
    }
}

/// Always fails, like a harvest where every image download broke.
struct BrokenImages;

#[async_trait]
impl PipelineStep for BrokenImages {
    fn metadata(&self) -> StepMetadata {
        FetchImagesStepMeta::metadata()
    }

    async fn execute(&self, _ctx: &StepContext<'_>) -> StepResult {
        StepResult::failure(FetchImagesStepMeta::NAME, "all images failed", Instant::now())
    }
}

fn registry(
    client: MockClient,
    provider: FakeProvider,
    saved: Arc<Mutex<Option<String>>>,
    fail_save: bool,
) -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry.register(Box::new(FetchHtmlStep::new(Arc::new(client))));
    registry.register(Box::new(SanitizeHtmlStep));
    registry.register(Box::new(ExtractRecipeStep::new(Arc::new(provider))));
    registry.register(Box::new(RecordingSave {
        saved,
        fail: fail_save,
    }));
    registry.register(Box::new(BrokenImages));
    registry
}

#[tokio::test]
async fn test_successful_import_survives_image_failure() {
    let saved = Arc::new(Mutex::new(None));
    let registry = registry(
        MockClient::new().with_html(URL, "<h1>Beef Stew</h1><ul><li>1 kg beef</li></ul>"),
        FakeProvider::new().with_default_response(ANSWER),
        saved.clone(),
        false,
    );

    let mut store = MemoryOutputStore::new();
    let results = run_pipeline(FetchHtmlStep::NAME, URL, &mut store, &registry).await;

    assert_eq!(results.len(), 5);
    assert!(!results[4].success);
    assert!(first_fatal_failure(&results, &registry).is_none());
    assert_eq!(saved.lock().unwrap().as_deref(), Some("Beef Stew"));
    // Failed steps do not write outputs
    assert!(store.get_output(FetchImagesStepMeta::NAME).is_none());

    let extracted: ExtractRecipeOutput =
        serde_json::from_value(store.get_output(ExtractRecipeStep::NAME).unwrap()).unwrap();
    assert_eq!(extracted.recipe.images, vec!["https://kitchen.test/img/stew.jpg"]);
}

#[tokio::test]
async fn test_fetch_failure_maps_to_fetch_failed() {
    let saved = Arc::new(Mutex::new(None));
    let provider = FakeProvider::new().with_default_response(ANSWER);
    let registry = registry(
        MockClient::new().with_status(URL, 503),
        provider,
        saved.clone(),
        false,
    );

    let mut store = MemoryOutputStore::new();
    let results = run_pipeline(FetchHtmlStep::NAME, URL, &mut store, &registry).await;

    let failure = first_fatal_failure(&results, &registry).unwrap();
    assert_eq!(
        ImportErrorCode::for_step(&failure.step_name),
        ImportErrorCode::FetchFailed
    );
    assert!(failure.error.as_deref().unwrap().contains("503"));
    assert!(saved.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_bad_model_output_maps_to_extraction_failed() {
    let saved = Arc::new(Mutex::new(None));
    let registry = registry(
        MockClient::new().with_html(URL, "<h1>Beef Stew</h1>"),
        FakeProvider::new().with_default_response("I could not find a recipe, sorry!"),
        saved.clone(),
        false,
    );

    let mut store = MemoryOutputStore::new();
    let results = run_pipeline(FetchHtmlStep::NAME, URL, &mut store, &registry).await;

    let failure = first_fatal_failure(&results, &registry).unwrap();
    assert_eq!(failure.step_name, ExtractRecipeStep::NAME);
    assert_eq!(
        ImportErrorCode::for_step(&failure.step_name),
        ImportErrorCode::ExtractionFailed
    );
    assert_eq!(
        failure.error.as_deref(),
        Some("The AI returned an invalid data format. Please try again.")
    );
    assert!(saved.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_persist_failure_skips_image_harvest() {
    let saved = Arc::new(Mutex::new(None));
    let registry = registry(
        MockClient::new().with_html(URL, "<h1>Beef Stew</h1>"),
        FakeProvider::new().with_default_response(ANSWER),
        saved,
        true,
    );

    let mut store = MemoryOutputStore::new();
    let results = run_pipeline(FetchHtmlStep::NAME, URL, &mut store, &registry).await;

    assert_eq!(results.len(), 4);
    let failure = first_fatal_failure(&results, &registry).unwrap();
    assert_eq!(
        ImportErrorCode::for_step(&failure.step_name),
        ImportErrorCode::PersistFailed
    );
}
