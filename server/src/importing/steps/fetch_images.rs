//! Server FetchImages step - harvests extracted image URLs into blob storage.

use std::time::Instant;

use async_trait::async_trait;
use cookbook_core::pipeline::steps::{ExtractRecipeStep, FetchImagesStepMeta};
use cookbook_core::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use cookbook_core::{
    fetch_and_validate_image, ExtractRecipeOutput, FailedImageFetch, FetchImagesOutput,
};
use uuid::Uuid;

use crate::images::store_recipe_image;
use crate::state::AppState;

pub struct FetchImagesStep {
    state: AppState,
    user_id: Uuid,
    recipe_id: Uuid,
}

impl FetchImagesStep {
    pub fn new(state: AppState, user_id: Uuid, recipe_id: Uuid) -> Self {
        Self {
            state,
            user_id,
            recipe_id,
        }
    }

    async fn fetch_and_store(&self, url: &str) -> Result<Uuid, String> {
        let fetched = fetch_and_validate_image(self.state.http.as_ref(), url)
            .await
            .map_err(|e| e.to_string())?;

        let image = store_recipe_image(
            &self.state,
            self.user_id,
            self.recipe_id,
            &fetched.data,
            fetched.kind,
        )
        .await
        .map_err(|e| e.to_string())?;

        tracing::info!(image_id = %image.id, url, "stored imported image");
        Ok(image.id)
    }
}

#[async_trait]
impl PipelineStep for FetchImagesStep {
    fn metadata(&self) -> StepMetadata {
        FetchImagesStepMeta::metadata()
    }

    /// Per-image failures are listed in the output; the step itself only
    /// fails when there is no extraction to read.
    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let extracted: ExtractRecipeOutput = match ctx.output(ExtractRecipeStep::NAME) {
            Ok(o) => o,
            Err(e) => return StepResult::failure(FetchImagesStepMeta::NAME, e, start),
        };

        let mut output = FetchImagesOutput::default();
        for url in &extracted.recipe.images {
            match self.fetch_and_store(url).await {
                Ok(id) => output.image_ids.push(id),
                Err(error) => {
                    tracing::warn!(url = %url, error = %error, "failed to harvest image");
                    output.failed_urls.push(FailedImageFetch {
                        url: url.clone(),
                        error,
                    });
                }
            }
        }

        StepResult::from_output(FetchImagesStepMeta::NAME, &output, None, start)
    }
}
