//! Request validation shared by create and update.

use cookbook_core::http::parse_http_url;
use cookbook_core::{assign_positions, normalize_name};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::ApiError;
use crate::recipes::IngredientFields;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngredientInput {
    pub raw_text: String,
    pub normalized_name: String,
    /// Requested order; the server renumbers positions to 0..n
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StepInput {
    pub step_text: String,
    /// Requested order; the server renumbers positions to 0..n
    pub position: Option<i32>,
}

pub fn title(value: &str) -> Result<String, ApiError> {
    let title = value.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }
    Ok(title.to_string())
}

pub fn minutes(field: &str, value: Option<i32>) -> Result<Option<i32>, ApiError> {
    match value {
        Some(m) if m < 0 => Err(ApiError::bad_request(format!(
            "{} must not be negative",
            field
        ))),
        other => Ok(other),
    }
}

/// A blank source URL is stored as null.
pub fn source_url(value: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    parse_http_url(raw).map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Some(raw.to_string()))
}

fn position(field: &str, index: usize, value: Option<i32>) -> Result<Option<i32>, ApiError> {
    match value {
        Some(p) if p < 0 => Err(ApiError::bad_request(format!(
            "{}[{}].position must not be negative",
            field, index
        ))),
        other => Ok(other),
    }
}

/// Validate ingredients and return them in final order.
pub fn ingredients(input: Vec<IngredientInput>) -> Result<Vec<IngredientFields>, ApiError> {
    if input.is_empty() {
        return Err(ApiError::bad_request("At least one ingredient is required"));
    }

    let mut items = Vec::with_capacity(input.len());
    for (i, ingredient) in input.into_iter().enumerate() {
        let raw_text = ingredient.raw_text.trim();
        if raw_text.is_empty() {
            return Err(ApiError::bad_request(format!(
                "ingredients[{}].raw_text cannot be empty",
                i
            )));
        }
        let normalized_name = normalize_name(&ingredient.normalized_name);
        if normalized_name.is_empty() {
            return Err(ApiError::bad_request(format!(
                "ingredients[{}].normalized_name cannot be empty",
                i
            )));
        }
        items.push((
            position("ingredients", i, ingredient.position)?,
            IngredientFields {
                raw_text: raw_text.to_string(),
                normalized_name,
            },
        ));
    }

    Ok(assign_positions(items)
        .into_iter()
        .map(|(_, fields)| fields)
        .collect())
}

/// Validate steps and return their text in final order.
pub fn steps(input: Vec<StepInput>) -> Result<Vec<String>, ApiError> {
    if input.is_empty() {
        return Err(ApiError::bad_request("At least one step is required"));
    }

    let mut items = Vec::with_capacity(input.len());
    for (i, step) in input.into_iter().enumerate() {
        let text = step.step_text.trim();
        if text.is_empty() {
            return Err(ApiError::bad_request(format!(
                "steps[{}].step_text cannot be empty",
                i
            )));
        }
        items.push((position("steps", i, step.position)?, text.to_string()));
    }

    Ok(assign_positions(items)
        .into_iter()
        .map(|(_, text)| text)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(raw: &str, name: &str, position: Option<i32>) -> IngredientInput {
        IngredientInput {
            raw_text: raw.to_string(),
            normalized_name: name.to_string(),
            position,
        }
    }

    fn step(text: &str, position: Option<i32>) -> StepInput {
        StepInput {
            step_text: text.to_string(),
            position,
        }
    }

    fn message(err: ApiError) -> String {
        match err {
            ApiError::BadRequest(msg) => msg,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[test]
    fn test_title_is_trimmed() {
        assert_eq!(title("  Soup \n").unwrap(), "Soup");
        assert_eq!(message(title("   ").unwrap_err()), "Title cannot be empty");
    }

    #[test]
    fn test_negative_minutes_rejected() {
        assert_eq!(minutes("cook_time_minutes", Some(0)).unwrap(), Some(0));
        assert_eq!(minutes("cook_time_minutes", None).unwrap(), None);
        assert_eq!(
            message(minutes("prep_time_minutes", Some(-1)).unwrap_err()),
            "prep_time_minutes must not be negative"
        );
    }

    #[test]
    fn test_source_url() {
        assert_eq!(source_url(None).unwrap(), None);
        assert_eq!(source_url(Some("  ")).unwrap(), None);
        assert_eq!(
            source_url(Some(" https://example.com/soup ")).unwrap().as_deref(),
            Some("https://example.com/soup")
        );
        assert!(source_url(Some("ftp://example.com/soup")).is_err());
        assert!(source_url(Some("not a url")).is_err());
    }

    #[test]
    fn test_ingredients_are_ordered_and_normalized() {
        let out = ingredients(vec![
            ingredient("2 cups Flour", "  All-Purpose  FLOUR ", Some(4)),
            ingredient("1 egg", "egg", Some(1)),
            ingredient("pinch of salt", "Salt", None),
        ])
        .unwrap();

        let names: Vec<&str> = out.iter().map(|i| i.normalized_name.as_str()).collect();
        assert_eq!(names, vec!["egg", "all-purpose flour", "salt"]);
        assert_eq!(out[1].raw_text, "2 cups Flour");
    }

    #[test]
    fn test_ingredient_validation_errors() {
        assert_eq!(
            message(ingredients(vec![]).unwrap_err()),
            "At least one ingredient is required"
        );
        assert_eq!(
            message(
                ingredients(vec![
                    ingredient("1 egg", "egg", None),
                    ingredient(" ", "x", None)
                ])
                .unwrap_err()
            ),
            "ingredients[1].raw_text cannot be empty"
        );
        assert_eq!(
            message(ingredients(vec![ingredient("1 egg", "  ", None)]).unwrap_err()),
            "ingredients[0].normalized_name cannot be empty"
        );
        assert_eq!(
            message(ingredients(vec![ingredient("1 egg", "egg", Some(-2))]).unwrap_err()),
            "ingredients[0].position must not be negative"
        );
    }

    #[test]
    fn test_steps_keep_input_order_on_ties() {
        let out = steps(vec![
            step("Serve", Some(3)),
            step("Chop", Some(0)),
            step("Boil", Some(0)),
        ])
        .unwrap();
        assert_eq!(out, vec!["Chop", "Boil", "Serve"]);

        assert_eq!(
            message(steps(vec![step("", None)]).unwrap_err()),
            "steps[0].step_text cannot be empty"
        );
    }
}
