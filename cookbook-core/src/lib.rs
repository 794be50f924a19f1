pub mod error;
pub mod extract;
pub mod http;
pub mod image;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod sanitize;
pub mod types;

pub use error::{ExtractError, FetchError};
pub use extract::{extract_recipe, ExtractedIngredient, ExtractedRecipe, ExtractedStep, Extraction};
pub use http::{HostAllowlist, HttpClient, MockClient, MockResponse, ReqwestClient};
pub use image::{
    fetch_and_validate_image, validate_image, FetchedImage, ImageError, ImageKind, MAX_FILE_SIZE,
};
pub use llm::{FakeProvider, LlmError, LlmProvider, OpenRouterConfig, OpenRouterProvider};
pub use normalize::{assign_positions, normalize_name};
pub use sanitize::sanitize_html;
pub use types::{
    ExtractRecipeOutput, FailedImageFetch, FetchHtmlOutput, FetchImagesOutput, ImportErrorCode,
    RecipeStatus, SanitizeHtmlOutput, SaveRecipeOutput,
};
