//! SanitizeHtml step - strips scripts, styles and inline SVG before extraction.

use std::time::Instant;

use async_trait::async_trait;

use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use crate::sanitize::sanitize_html;
use crate::types::{FetchHtmlOutput, SanitizeHtmlOutput};

use super::{ExtractRecipeStep, FetchHtmlStep};

pub struct SanitizeHtmlStep;

impl SanitizeHtmlStep {
    pub const NAME: &'static str = "sanitize_html";
}

#[async_trait]
impl PipelineStep for SanitizeHtmlStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Remove markup noise from fetched HTML",
            continues_on_failure: false,
        }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        let fetched: FetchHtmlOutput = match ctx.output(FetchHtmlStep::NAME) {
            Ok(o) => o,
            Err(e) => return StepResult::failure(Self::NAME, e, start),
        };

        let content = sanitize_html(&fetched.html);
        if content.is_empty() {
            return StepResult::failure(Self::NAME, "Page has no readable content", start);
        }

        tracing::debug!(
            original_len = fetched.html.len(),
            sanitized_len = content.len(),
            "sanitized html"
        );

        StepResult::from_output(
            Self::NAME,
            &SanitizeHtmlOutput {
                content,
                original_len: fetched.html.len(),
            },
            Some(ExtractRecipeStep::NAME),
            start,
        )
    }
}
