//! ExtractRecipe step - asks the LLM for structured recipe data.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::extract::extract_recipe;
use crate::llm::LlmProvider;
use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use crate::types::{ExtractRecipeOutput, SanitizeHtmlOutput};

use super::{SanitizeHtmlStep, SaveRecipeStepMeta};

pub struct ExtractRecipeStep {
    provider: Arc<dyn LlmProvider>,
}

impl ExtractRecipeStep {
    pub const NAME: &'static str = "extract_recipe";

    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl PipelineStep for ExtractRecipeStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Extract recipe fields with the LLM",
            continues_on_failure: false,
        }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let sanitized: SanitizeHtmlOutput = match ctx.output(SanitizeHtmlStep::NAME) {
            Ok(o) => o,
            Err(e) => return StepResult::failure(Self::NAME, e, start),
        };

        match extract_recipe(self.provider.as_ref(), &sanitized.content, ctx.url).await {
            Ok(extraction) => StepResult::from_output(
                Self::NAME,
                &ExtractRecipeOutput {
                    recipe: extraction.recipe,
                    model: extraction.model,
                    usage: extraction.usage,
                },
                Some(SaveRecipeStepMeta::NAME),
                start,
            ),
            Err(e) => StepResult::failure(Self::NAME, e.to_string(), start),
        }
    }
}
