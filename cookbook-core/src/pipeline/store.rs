//! In-memory step output store.

use std::collections::HashMap;
use std::error::Error;

use serde_json::Value as JsonValue;

use super::StepOutputStore;

/// Keeps step outputs for the lifetime of a single run.
///
/// Imports do not checkpoint between steps; a retry starts over from
/// `fetch_html`, so nothing needs to outlive the run.
#[derive(Debug, Default)]
pub struct MemoryOutputStore {
    outputs: HashMap<String, JsonValue>,
}

impl MemoryOutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, e.g. to run a pipeline from a later step.
    pub fn with_output(mut self, step_name: &str, output: JsonValue) -> Self {
        self.outputs.insert(step_name.to_string(), output);
        self
    }
}

impl StepOutputStore for MemoryOutputStore {
    fn get_output(&self, step_name: &str) -> Option<JsonValue> {
        self.outputs.get(step_name).cloned()
    }

    fn save_output(
        &mut self,
        step_name: &str,
        output: &JsonValue,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.outputs.insert(step_name.to_string(), output.clone());
        Ok(())
    }
}
