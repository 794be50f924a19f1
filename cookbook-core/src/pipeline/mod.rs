//! Step pipeline for recipe imports.
//!
//! - Steps implement [`PipelineStep`] and name their successor via `next_step`
//! - The server builds a [`StepRegistry`] that adds its DB-backed steps
//! - Outputs flow between steps through a [`StepOutputStore`]
//!
//! Import order: fetch_html, sanitize_html, extract_recipe, save_recipe,
//! fetch_images.

mod executor;
mod step;
mod store;
pub mod steps;

pub use executor::{first_fatal_failure, run_pipeline, StepRegistry};
pub use step::{PipelineStep, StepContext, StepMetadata, StepOutputStore, StepResult};
pub use store::MemoryOutputStore;
