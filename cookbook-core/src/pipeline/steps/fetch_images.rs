//! FetchImages step metadata - the implementation lives in the server.

use crate::pipeline::StepMetadata;

/// Metadata for the FetchImages step.
///
/// Image harvesting is best effort: a failure here never fails the import.
pub struct FetchImagesStepMeta;

impl FetchImagesStepMeta {
    pub const NAME: &'static str = "fetch_images";

    pub fn metadata() -> StepMetadata {
        StepMetadata {
            name: Self::NAME,
            description: "Download extracted images into blob storage",
            continues_on_failure: true,
        }
    }
}
