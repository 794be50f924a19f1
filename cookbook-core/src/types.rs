use serde::{Deserialize, Serialize};
use std::fmt;

use crate::extract::ExtractedRecipe;
use crate::llm::Usage;

/// Lifecycle status shared by recipes and their imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeStatus {
    Processing,
    Succeeded,
    Failed,
}

impl RecipeStatus {
    pub const ALL: &'static [RecipeStatus] = &[
        RecipeStatus::Processing,
        RecipeStatus::Succeeded,
        RecipeStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeStatus::Processing => "processing",
            RecipeStatus::Succeeded => "succeeded",
            RecipeStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(RecipeStatus::Processing),
            "succeeded" => Some(RecipeStatus::Succeeded),
            "failed" => Some(RecipeStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecipeStatus::Processing)
    }
}

impl fmt::Display for RecipeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable reason an import failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportErrorCode {
    FetchFailed,
    ExtractionFailed,
    PersistFailed,
}

impl ImportErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportErrorCode::FetchFailed => "fetch_failed",
            ImportErrorCode::ExtractionFailed => "extraction_failed",
            ImportErrorCode::PersistFailed => "persist_failed",
        }
    }

    /// Map the pipeline step that failed to an error code.
    pub fn for_step(step_name: &str) -> Self {
        match step_name {
            "fetch_html" => ImportErrorCode::FetchFailed,
            "sanitize_html" | "extract_recipe" => ImportErrorCode::ExtractionFailed,
            _ => ImportErrorCode::PersistFailed,
        }
    }
}

impl fmt::Display for ImportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output from the fetch_html step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchHtmlOutput {
    pub html: String,
}

/// Output from the sanitize_html step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizeHtmlOutput {
    pub content: String,
    pub original_len: usize,
}

/// Output from the extract_recipe step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRecipeOutput {
    pub recipe: ExtractedRecipe,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Output from the save_recipe step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecipeOutput {
    pub ingredient_count: usize,
    pub step_count: usize,
}

/// An image URL that could not be harvested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedImageFetch {
    pub url: String,
    pub error: String,
}

/// Output from the fetch_images step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchImagesOutput {
    pub image_ids: Vec<uuid::Uuid>,
    pub failed_urls: Vec<FailedImageFetch>,
}
