//! Image validation shared by uploads and import harvesting.
//!
//! The format is always sniffed from the bytes; declared content types are
//! only a first filter at the HTTP layer.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use thiserror::Error;

use crate::error::FetchError;
use crate::http::HttpClient;

/// Formats accepted for recipe images.
pub const ALLOWED_FORMATS: &[ImageFormat] =
    &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// Maximum size for a single image (5 MiB).
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Could not detect image format")]
    UnknownFormat,

    #[error("Unsupported image format: {0}. Allowed: JPEG, PNG, WebP")]
    Unsupported(String),

    #[error("Failed to fetch image: {0}")]
    Fetch(#[from] FetchError),
}

/// A validated image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind(ImageFormat);

impl ImageKind {
    pub fn format(&self) -> ImageFormat {
        self.0
    }

    pub fn mime_type(&self) -> &'static str {
        self.0.to_mime_type()
    }

    /// File extension used for stored objects.
    pub fn extension(&self) -> &'static str {
        match self.0 {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
            other => other.extensions_str().first().copied().unwrap_or("bin"),
        }
    }
}

/// Result of fetching and validating a remote image.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub data: Vec<u8>,
    pub kind: ImageKind,
}

/// Check size and sniff the format from magic bytes.
pub fn validate_image(data: &[u8]) -> Result<ImageKind, ImageError> {
    if data.len() > MAX_FILE_SIZE {
        return Err(ImageError::TooLarge {
            size: data.len(),
            max: MAX_FILE_SIZE,
        });
    }

    let format = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|_| ImageError::UnknownFormat)?
        .format()
        .ok_or(ImageError::UnknownFormat)?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(ImageError::Unsupported(format!("{:?}", format)));
    }

    Ok(ImageKind(format))
}

/// Fetch an image through `client` and validate it.
pub async fn fetch_and_validate_image<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<FetchedImage, ImageError> {
    let data = client.fetch_bytes(url).await?;
    let kind = validate_image(&data)?;
    Ok(FetchedImage { data, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockClient;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const GIF_MAGIC: &[u8] = b"GIF89a\x01\x00\x01\x00";

    #[test]
    fn test_detects_png_from_magic_bytes() {
        let kind = validate_image(PNG_MAGIC).unwrap();
        assert_eq!(kind.mime_type(), "image/png");
        assert_eq!(kind.extension(), "png");
    }

    #[test]
    fn test_jpeg_extension() {
        let kind = validate_image(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]).unwrap();
        assert_eq!(kind.extension(), "jpg");
        assert_eq!(kind.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_rejects_gif_and_garbage() {
        assert!(matches!(
            validate_image(GIF_MAGIC),
            Err(ImageError::Unsupported(_))
        ));
        assert!(matches!(
            validate_image(b"not an image"),
            Err(ImageError::UnknownFormat)
        ));
    }

    #[test]
    fn test_rejects_oversized() {
        let data = vec![0u8; MAX_FILE_SIZE + 1];
        assert!(matches!(
            validate_image(&data),
            Err(ImageError::TooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_and_validate() {
        let client = MockClient::new()
            .with_bytes("https://img.test/a.png", PNG_MAGIC.to_vec())
            .with_status("https://img.test/gone.png", 404);

        let fetched = fetch_and_validate_image(&client, "https://img.test/a.png")
            .await
            .unwrap();
        assert_eq!(fetched.data.len(), PNG_MAGIC.len());

        assert!(matches!(
            fetch_and_validate_image(&client, "https://img.test/gone.png").await,
            Err(ImageError::Fetch(_))
        ));
    }
}
