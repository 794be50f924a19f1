//! FetchHtml step - downloads the source page using an injected HTTP client.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::http::HttpClient;
use crate::pipeline::{PipelineStep, StepContext, StepMetadata, StepResult};
use crate::types::FetchHtmlOutput;

use super::SanitizeHtmlStep;

pub struct FetchHtmlStep {
    client: Arc<dyn HttpClient>,
}

impl FetchHtmlStep {
    pub const NAME: &'static str = "fetch_html";

    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PipelineStep for FetchHtmlStep {
    fn metadata(&self) -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Fetch HTML from the source URL",
            continues_on_failure: false,
        }
    }

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult {
        let start = Instant::now();

        match self.client.fetch_html(ctx.url).await {
            Ok(html) if html.trim().is_empty() => {
                StepResult::failure(Self::NAME, "Fetched page is empty", start)
            }
            Ok(html) => StepResult::from_output(
                Self::NAME,
                &FetchHtmlOutput { html },
                Some(SanitizeHtmlStep::NAME),
                start,
            ),
            Err(e) => StepResult::failure(Self::NAME, e.to_string(), start),
        }
    }
}
