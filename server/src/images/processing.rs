use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

pub const MAX_RENDITION_SIZE: u32 = 800;

/// Clamp a requested rendition size to the supported range.
pub fn clamp_size(size: u32) -> u32 {
    size.clamp(1, MAX_RENDITION_SIZE)
}

/// Render a square, cover-cropped JPEG of `size` pixels from raw image data.
pub fn render_cover(data: &[u8], size: u32) -> Result<Vec<u8>, String> {
    let size = clamp_size(size);

    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Failed to read image: {}", e))?
        .decode()
        .map_err(|e| format!("Failed to decode image: {}", e))?;

    // resize_to_fill() keeps the aspect ratio and crops the overflow
    let resized = img.resize_to_fill(size, size, FilterType::Triangle);

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| format!("Failed to encode image: {}", e))?;

    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_clamp_size() {
        assert_eq!(clamp_size(0), 1);
        assert_eq!(clamp_size(200), 200);
        assert_eq!(clamp_size(5000), 800);
    }

    #[test]
    fn test_render_cover_is_square_jpeg() {
        let rendered = render_cover(&png(300, 120), 64).unwrap();

        let img = image::load_from_memory(&rendered).unwrap();
        assert_eq!(img.dimensions(), (64, 64));
        assert_eq!(
            image::guess_format(&rendered).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_render_cover_rejects_garbage() {
        assert!(render_cover(b"definitely not an image", 100).is_err());
    }
}
