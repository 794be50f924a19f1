//! Structured recipe extraction via an LLM.
//!
//! The model receives sanitized page content and must answer with JSON
//! matching [`recipe_schema`]. Its answer is then cleaned up: texts trimmed,
//! ingredient names normalized, image URLs resolved and filtered.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::error::ExtractError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider, ResponseFormat, Usage};
use crate::normalize::{collapse_whitespace, normalize_name};
use crate::sanitize::{truncate, MAX_SANITIZED_LEN};

/// At most this many image URLs are kept from an extraction.
pub const MAX_IMAGES: usize = 3;

pub const SCHEMA_NAME: &str = "recipe_extraction";

const SYSTEM_PROMPT: &str = "You are a culinary data extraction expert. Your goal is to transform \
messy HTML or text from cooking websites into structured recipe data.

Rules:
1. Title: the main name of the dish.
2. Times: give cook_time_minutes and prep_time_minutes as integers, or null when the page does not state them.
3. Ingredients: raw_text is the full line as written on the page (e.g. '2 tbsp extra virgin olive oil'); \
normalized_name is the plain ingredient name in lowercase without quantities (e.g. 'olive oil').
4. Steps: list each instruction step separately. Never invent steps.
5. Images: up to 3 absolute URLs of .jpg or .png images that belong to this recipe, preferring the finished dish. \
Ignore logos, avatars and images of other recipes.
6. Ignore everything that is not the recipe: ads, related posts, comments, navigation.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedIngredient {
    pub raw_text: String,
    pub normalized_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedStep {
    pub step_text: String,
}

/// Recipe as returned by the extraction model, after cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    pub title: String,
    pub cook_time_minutes: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub ingredients: Vec<ExtractedIngredient>,
    pub steps: Vec<ExtractedStep>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Extraction result plus provenance for the import metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub recipe: ExtractedRecipe,
    pub model: String,
    pub usage: Option<Usage>,
}

/// JSON schema the model's answer must follow.
pub fn recipe_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "cook_time_minutes": { "type": ["integer", "null"] },
            "prep_time_minutes": { "type": ["integer", "null"] },
            "ingredients": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "raw_text": { "type": "string" },
                        "normalized_name": { "type": "string" }
                    },
                    "required": ["raw_text", "normalized_name"],
                    "additionalProperties": false
                }
            },
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "step_text": { "type": "string" }
                    },
                    "required": ["step_text"],
                    "additionalProperties": false
                }
            },
            "images": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["title", "cook_time_minutes", "prep_time_minutes", "ingredients", "steps", "images"],
        "additionalProperties": false
    })
}

/// Build the chat request for already-sanitized page content.
pub fn build_request(content: &str) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Extract the recipe from the following content:\n\n{}",
                truncate(content, MAX_SANITIZED_LEN)
            )),
        ],
        temperature: Some(0.1),
        max_tokens: None,
        response_format: Some(ResponseFormat::json_schema(SCHEMA_NAME, recipe_schema())),
    }
}

/// Ask `provider` to extract a recipe from sanitized content found at `source_url`.
pub async fn extract_recipe(
    provider: &dyn LlmProvider,
    content: &str,
    source_url: &str,
) -> Result<Extraction, ExtractError> {
    if content.trim().is_empty() {
        return Err(ExtractError::EmptyContent);
    }

    let response = provider.complete(build_request(content)).await?;
    let recipe = parse_extraction(&response.content, source_url)?;

    tracing::info!(
        model = %response.model,
        ingredients = recipe.ingredients.len(),
        steps = recipe.steps.len(),
        images = recipe.images.len(),
        "extracted recipe"
    );

    Ok(Extraction {
        recipe,
        model: response.model,
        usage: response.usage,
    })
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    cook_time_minutes: Option<f64>,
    #[serde(default)]
    prep_time_minutes: Option<f64>,
    #[serde(default)]
    ingredients: Vec<RawIngredient>,
    #[serde(default)]
    steps: Vec<RawStep>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawIngredient {
    #[serde(default)]
    raw_text: String,
    #[serde(default)]
    normalized_name: String,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    step_text: String,
}

/// Parse and clean the model's JSON answer.
pub fn parse_extraction(raw: &str, source_url: &str) -> Result<ExtractedRecipe, ExtractError> {
    let parsed: RawExtraction = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| ExtractError::InvalidJson(e.to_string()))?;

    let title = parsed
        .title
        .map(|t| collapse_whitespace(&t))
        .filter(|t| !t.is_empty())
        .ok_or(ExtractError::MissingField("title"))?;

    let ingredients: Vec<ExtractedIngredient> = parsed
        .ingredients
        .into_iter()
        .filter_map(|i| {
            let raw_text = collapse_whitespace(&i.raw_text);
            if raw_text.is_empty() {
                return None;
            }
            let mut normalized_name = normalize_name(&i.normalized_name);
            if normalized_name.is_empty() {
                normalized_name = normalize_name(&raw_text);
            }
            Some(ExtractedIngredient {
                raw_text,
                normalized_name,
            })
        })
        .collect();

    let steps: Vec<ExtractedStep> = parsed
        .steps
        .into_iter()
        .map(|s| s.step_text.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|step_text| ExtractedStep { step_text })
        .collect();

    if ingredients.is_empty() && steps.is_empty() {
        return Err(ExtractError::MissingField("ingredients and steps"));
    }

    Ok(ExtractedRecipe {
        title,
        cook_time_minutes: minutes(parsed.cook_time_minutes),
        prep_time_minutes: minutes(parsed.prep_time_minutes),
        ingredients,
        steps,
        images: filter_image_urls(&parsed.images, source_url),
    })
}

fn minutes(value: Option<f64>) -> Option<i32> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0 && *v <= i32::MAX as f64)
        .map(|v| v.round() as i32)
}

/// Some models wrap JSON in a markdown fence despite the response format.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Resolve image URLs against the page, keep http(s) JPEG/PNG links, dedupe,
/// and cap at [`MAX_IMAGES`].
pub fn filter_image_urls(images: &[String], source_url: &str) -> Vec<String> {
    let base = url::Url::parse(source_url).ok();
    let mut kept: Vec<String> = Vec::new();

    for candidate in images {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            continue;
        }
        let resolved = match &base {
            Some(base) => base.join(candidate),
            None => url::Url::parse(candidate),
        };
        let Ok(url) = resolved else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        let path = url.path().to_ascii_lowercase();
        if !(path.ends_with(".jpg") || path.ends_with(".jpeg") || path.ends_with(".png")) {
            continue;
        }
        let url = url.to_string();
        if !kept.contains(&url) {
            kept.push(url);
        }
        if kept.len() == MAX_IMAGES {
            break;
        }
    }

    kept
}
