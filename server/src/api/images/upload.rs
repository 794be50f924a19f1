use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::AuthUser;
use crate::get_conn;
use crate::images::{signed, store_recipe_image};
use crate::recipes::find_owned;
use crate::state::AppState;
use crate::types::ImageDto;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use cookbook_core::{validate_image, ImageError, ImageKind, MAX_FILE_SIZE};
use image::ImageFormat;
use utoipa::ToSchema;
use uuid::Uuid;

/// Request body limit for uploads: the file plus multipart framing.
pub const BODY_LIMIT: usize = MAX_FILE_SIZE + 1024 * 1024;

const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadImageRequest {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

fn too_large() -> ApiError {
    ApiError::PayloadTooLarge(format!(
        "File too large. Maximum size is {} MiB",
        MAX_FILE_SIZE / (1024 * 1024)
    ))
}

fn multipart_error(e: MultipartError) -> ApiError {
    tracing::warn!("Multipart read error: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        ApiError::bad_request(format!("Failed to read multipart data: {}", e.body_text()))
    }
}

fn check_content_type(declared: Option<&str>) -> Result<(), ApiError> {
    match declared {
        Some(ct) if ALLOWED_CONTENT_TYPES.contains(&ct) => Ok(()),
        _ => Err(ApiError::bad_request(
            "Only image/jpeg and image/png uploads are allowed",
        )),
    }
}

/// Sniff the uploaded bytes; only JPEG and PNG are accepted here.
fn check_image(data: &[u8]) -> Result<ImageKind, ApiError> {
    let kind = validate_image(data).map_err(|e| match e {
        ImageError::TooLarge { .. } => too_large(),
        other => ApiError::bad_request(other.to_string()),
    })?;
    match kind.format() {
        ImageFormat::Jpeg | ImageFormat::Png => Ok(kind),
        _ => Err(ApiError::bad_request(
            "File content is not a JPEG or PNG image",
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/images",
    tag = "images",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body(content_type = "multipart/form-data", content = UploadImageRequest),
    responses(
        (status = 201, description = "Image stored", body = ImageDto),
        (status = 400, description = "Invalid file", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_image(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ImageDto>)> {
    {
        let mut conn = get_conn!(state.pool);
        find_owned(&mut conn, user.id, id)?
            .ok_or_else(|| ApiError::not_found("Recipe not found"))?;
    }

    let data = loop {
        let Some(field) = multipart.next_field().await.map_err(multipart_error)? else {
            return Err(ApiError::bad_request("No file provided"));
        };
        if field.name() != Some("file") {
            continue;
        }
        check_content_type(field.content_type())?;
        break field.bytes().await.map_err(multipart_error)?;
    };

    if data.len() > MAX_FILE_SIZE {
        return Err(too_large());
    }
    let kind = check_image(&data)?;

    let image = store_recipe_image(&state, user.id, id, &data, kind).await?;

    tracing::info!(
        recipe_id = %id,
        image_id = %image.id,
        bytes = data.len(),
        "stored uploaded image"
    );

    Ok((StatusCode::CREATED, Json(signed(&state, image, None))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_declared_content_type() {
        assert!(check_content_type(Some("image/jpeg")).is_ok());
        assert!(check_content_type(Some("image/png")).is_ok());
        assert!(check_content_type(Some("image/gif")).is_err());
        assert!(check_content_type(None).is_err());
    }

    #[test]
    fn test_sniffed_format() {
        assert_eq!(
            check_image(&encoded(ImageFormat::Png)).unwrap().extension(),
            "png"
        );
        assert_eq!(
            check_image(&encoded(ImageFormat::Jpeg)).unwrap().extension(),
            "jpg"
        );
        assert!(matches!(
            check_image(b"definitely not an image"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_oversized_upload_is_413() {
        let mut data = encoded(ImageFormat::Png);
        data.resize(MAX_FILE_SIZE + 1, 0);
        assert_eq!(check_image(&data).unwrap_err().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
