//! Pipeline executor and step registry.

use std::collections::HashMap;

use tracing::{info_span, Instrument};

use crate::pipeline::step::{PipelineStep, StepContext, StepOutputStore, StepResult};

/// Hard stop for misconfigured registries whose steps point at each other.
const MAX_STEPS_PER_RUN: usize = 32;

/// Registry that maps step names to their implementations.
#[derive(Default)]
pub struct StepRegistry {
    steps: HashMap<String, Box<dyn PipelineStep>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step implementation. A later registration with the same
    /// name replaces the earlier one.
    pub fn register(&mut self, step: Box<dyn PipelineStep>) {
        self.steps.insert(step.metadata().name.to_string(), step);
    }

    pub fn get(&self, name: &str) -> Option<&dyn PipelineStep> {
        self.steps.get(name).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Run a pipeline starting from the given step.
///
/// Each step names its successor via `next_step`. The run ends when a step
/// returns no successor, names a step that is not registered, or fails without
/// `continues_on_failure`. Successful outputs are saved to `store` so later
/// steps can read them.
pub async fn run_pipeline(
    first_step_name: &str,
    url: &str,
    store: &mut dyn StepOutputStore,
    registry: &StepRegistry,
) -> Vec<StepResult> {
    let mut results = Vec::new();
    let mut current_step_name = Some(first_step_name.to_string());

    while let Some(step_name) = current_step_name {
        if results.len() >= MAX_STEPS_PER_RUN {
            tracing::error!(step = %step_name, "pipeline exceeded step limit, stopping");
            break;
        }

        let Some(step) = registry.get(&step_name) else {
            tracing::warn!(step = %step_name, "unknown pipeline step, stopping");
            break;
        };

        let meta = step.metadata();
        let ctx = StepContext {
            url,
            outputs: &*store,
        };
        let result = step
            .execute(&ctx)
            .instrument(info_span!("pipeline_step", step = %step_name))
            .await;

        if result.success {
            if let Err(e) = store.save_output(meta.name, &result.output) {
                tracing::warn!("Failed to save output for step {}: {}", meta.name, e);
            }
        } else {
            tracing::warn!(
                step = meta.name,
                error = result.error.as_deref().unwrap_or("unknown error"),
                continues = meta.continues_on_failure,
                "pipeline step failed"
            );
        }

        let should_continue = result.success || meta.continues_on_failure;
        let next = result.next_step.clone();
        results.push(result);

        if !should_continue {
            break;
        }

        current_step_name = next;
    }

    results
}

/// The first fatal failure in a run, if any.
///
/// Failures of steps registered with `continues_on_failure` are ignored.
pub fn first_fatal_failure<'a>(
    results: &'a [StepResult],
    registry: &StepRegistry,
) -> Option<&'a StepResult> {
    results.iter().find(|r| {
        !r.success
            && registry
                .get(&r.step_name)
                .map(|s| !s.metadata().continues_on_failure)
                .unwrap_or(true)
    })
}
