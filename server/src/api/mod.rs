mod error;
pub mod images;
pub mod imports;
mod pagination;
pub mod public;
pub mod recipes;
pub mod storage;

pub use error::{ApiError, ApiResult};

use cookbook_core::RecipeStatus;
use serde::Serialize;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{OpenApi, ToSchema};

use crate::types::{ImageDto, ImportDto, IngredientDto, RecipeDto, RecipeWithChildren, StepDto};

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Parse an optional `?status=` filter; blank means no filter.
pub(crate) fn status_filter(value: Option<&str>) -> ApiResult<Option<RecipeStatus>> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => RecipeStatus::parse(s)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request("Invalid status")),
        None => Ok(None),
    }
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Base spec with shared components and security
    #[derive(OpenApi)]
    #[openapi(components(schemas(
        ErrorResponse,
        RecipeDto,
        IngredientDto,
        StepDto,
        ImportDto,
        ImageDto,
        RecipeWithChildren,
    )))]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    if let Some(components) = spec.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }

    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        public::ApiDoc::openapi(),
        recipes::ApiDoc::openapi(),
        imports::ApiDoc::openapi(),
        images::ApiDoc::openapi(),
        storage::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);

        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter() {
        assert_eq!(status_filter(None).unwrap(), None);
        assert_eq!(status_filter(Some(" ")).unwrap(), None);
        assert_eq!(
            status_filter(Some("failed")).unwrap(),
            Some(RecipeStatus::Failed)
        );
        assert!(matches!(
            status_filter(Some("done")),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_openapi_lists_every_route() {
        let spec = openapi();
        let paths: Vec<&str> = spec.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/api/health",
            "/api/auth/register",
            "/api/auth/login",
            "/api/auth/logout",
            "/api/recipes",
            "/api/recipes/{id}",
            "/api/recipes/{id}/revisions",
            "/api/recipes/import",
            "/api/recipes/imports",
            "/api/recipes/imports/{id}",
            "/api/recipes/imports/{id}/retry",
            "/api/recipes/{id}/images",
            "/api/recipes/{id}/images/{image_id}",
            "/api/storage/{path}",
        ] {
            assert!(paths.contains(&expected), "missing {}", expected);
        }

        let schemas = &spec.components.as_ref().unwrap().schemas;
        assert!(schemas.contains_key("ErrorResponse"));
        assert!(schemas.contains_key("ImportDto"));
    }
}
