//! JSON shapes shared by several endpoints.

use chrono::{DateTime, Utc};
use cookbook_core::RecipeStatus;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Recipe, RecipeImport, RecipeIngredient, RecipeStep};

/// Parse a status column. The table constraint only admits known values.
pub fn parse_status(value: &str) -> RecipeStatus {
    RecipeStatus::parse(value).unwrap_or_else(|| {
        tracing::warn!(status = value, "unknown status in database");
        RecipeStatus::Failed
    })
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeDto {
    pub id: Uuid,
    pub title: String,
    pub cook_time_minutes: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub source_url: Option<String>,
    #[schema(value_type = String, example = "succeeded")]
    pub status: RecipeStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Recipe> for RecipeDto {
    fn from(r: Recipe) -> Self {
        Self {
            id: r.id,
            title: r.title,
            cook_time_minutes: r.cook_time_minutes,
            prep_time_minutes: r.prep_time_minutes,
            source_url: r.source_url,
            status: parse_status(&r.status),
            error_message: r.error_message,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientDto {
    pub id: Uuid,
    pub raw_text: String,
    pub normalized_name: String,
    pub position: i32,
}

impl From<RecipeIngredient> for IngredientDto {
    fn from(i: RecipeIngredient) -> Self {
        Self {
            id: i.id,
            raw_text: i.raw_text,
            normalized_name: i.normalized_name,
            position: i.position,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StepDto {
    pub id: Uuid,
    pub step_text: String,
    pub position: i32,
}

impl From<RecipeStep> for StepDto {
    fn from(s: RecipeStep) -> Self {
        Self {
            id: s.id,
            step_text: s.step_text,
            position: s.position,
        }
    }
}

/// An import row. The owner is implied by the session and never serialized.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportDto {
    pub id: Uuid,
    pub recipe_id: Option<Uuid>,
    pub source_url: String,
    #[schema(value_type = String, example = "processing")]
    pub status: RecipeStatus,
    pub attempt_count: i32,
    /// fetch_failed, extraction_failed or persist_failed
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RecipeImport> for ImportDto {
    fn from(i: RecipeImport) -> Self {
        Self {
            id: i.id,
            recipe_id: i.recipe_id,
            source_url: i.source_url,
            status: parse_status(&i.status),
            attempt_count: i.attempt_count,
            error_code: i.error_code,
            error_message: i.error_message,
            metadata: i.metadata,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageDto {
    pub id: Uuid,
    pub position: i32,
    /// Signed URL, valid for a few minutes
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A recipe with its ordered children.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeWithChildren {
    pub recipe: RecipeDto,
    pub ingredients: Vec<IngredientDto>,
    pub steps: Vec<StepDto>,
}
