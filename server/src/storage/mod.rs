//! Private blob storage for recipe images.
//!
//! Objects live under `{user_id}/{recipe_id}/{uuid}.{ext}` and are only ever
//! handed to clients as time-limited signed URLs (see [`UrlSigner`]).

mod local;
mod signing;

pub use local::LocalBlobStore;
pub use signing::{SignatureError, UrlSigner, SIGNED_URL_TTL_SECS};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Object store for image blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, data: &[u8]) -> Result<(), StorageError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove an object. Removing a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Storage path for a new image of a recipe.
pub fn image_path(user_id: Uuid, recipe_id: Uuid, extension: &str) -> String {
    format!("{}/{}/{}.{}", user_id, recipe_id, Uuid::new_v4(), extension)
}

/// Content type for a stored object, from its extension.
pub fn content_type_for(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_path_layout() {
        let user = Uuid::new_v4();
        let recipe = Uuid::new_v4();
        let path = image_path(user, recipe, "png");

        let parts: Vec<&str> = path.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], user.to_string());
        assert_eq!(parts[1], recipe.to_string());
        assert!(parts[2].ends_with(".png"));
        assert!(Uuid::parse_str(parts[2].trim_end_matches(".png")).is_ok());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a/b/c.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a/b/c.png"), "image/png");
        assert_eq!(content_type_for("a/b/c.webp"), "image/webp");
        assert_eq!(content_type_for("a/b/c"), "application/octet-stream");
    }
}
