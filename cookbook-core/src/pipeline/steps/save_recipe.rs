//! SaveRecipe step metadata - the implementation lives in the server.

use crate::pipeline::StepMetadata;

/// Metadata for the SaveRecipe step.
///
/// Persisting needs database access, so core only fixes the name and failure
/// semantics; the server registers the implementation.
pub struct SaveRecipeStepMeta;

impl SaveRecipeStepMeta {
    pub const NAME: &'static str = "save_recipe";

    pub fn metadata() -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Write extracted fields, ingredients and steps",
            continues_on_failure: false,
        }
    }
}
