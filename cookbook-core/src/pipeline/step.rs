//! Pipeline step trait and supporting types.

use std::error::Error;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Metadata about a pipeline step.
#[derive(Debug, Clone)]
pub struct StepMetadata {
    /// Unique identifier for this step (e.g., "fetch_html", "extract_recipe")
    pub name: &'static str,
    pub description: &'static str,
    /// If true, failures don't fail the overall pipeline
    pub continues_on_failure: bool,
}

/// Result of executing a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub success: bool,
    /// The output data (JSON)
    pub output: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    /// Name of the next step to run; the step decides what follows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,
}

impl StepResult {
    pub fn success(
        step_name: &str,
        output: JsonValue,
        next_step: Option<&str>,
        started: Instant,
    ) -> Self {
        Self {
            step_name: step_name.to_string(),
            success: true,
            output,
            error: None,
            duration_ms: started.elapsed().as_millis() as u64,
            next_step: next_step.map(str::to_string),
        }
    }

    pub fn failure(step_name: &str, error: impl Into<String>, started: Instant) -> Self {
        Self {
            step_name: step_name.to_string(),
            success: false,
            output: JsonValue::Null,
            error: Some(error.into()),
            duration_ms: started.elapsed().as_millis() as u64,
            next_step: None,
        }
    }

    /// Serialize a typed output into a successful result.
    pub fn from_output<T: Serialize>(
        step_name: &str,
        output: &T,
        next_step: Option<&str>,
        started: Instant,
    ) -> Self {
        match serde_json::to_value(output) {
            Ok(value) => Self::success(step_name, value, next_step, started),
            Err(e) => Self::failure(
                step_name,
                format!("Failed to serialize output: {}", e),
                started,
            ),
        }
    }
}

/// Abstraction for reading/writing step outputs.
pub trait StepOutputStore: Send + Sync {
    /// Get the output from a previous step by name.
    fn get_output(&self, step_name: &str) -> Option<JsonValue>;

    fn save_output(
        &mut self,
        step_name: &str,
        output: &JsonValue,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Context provided to steps during execution.
pub struct StepContext<'a> {
    /// URL being imported
    pub url: &'a str,
    /// Access to prior step outputs
    pub outputs: &'a dyn StepOutputStore,
}

impl StepContext<'_> {
    /// Read and deserialize the output of an earlier step.
    pub fn output<T: DeserializeOwned>(&self, step_name: &str) -> Result<T, String> {
        let value = self
            .outputs
            .get_output(step_name)
            .ok_or_else(|| format!("{} output not found", step_name))?;
        serde_json::from_value(value)
            .map_err(|e| format!("Failed to parse {} output: {}", step_name, e))
    }
}

/// The main trait for pipeline steps.
#[async_trait]
pub trait PipelineStep: Send + Sync {
    fn metadata(&self) -> StepMetadata;

    async fn execute(&self, ctx: &StepContext<'_>) -> StepResult;
}
