//! Recipe image storage shared by uploads and import harvesting.

pub mod processing;

use chrono::Utc;
use cookbook_core::ImageKind;
use thiserror::Error;
use uuid::Uuid;

use crate::models::RecipeImage;
use crate::recipes;
use crate::state::AppState;
use crate::storage::{image_path, StorageError};
use crate::types::ImageDto;

#[derive(Error, Debug)]
pub enum StoreImageError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Database connection failed: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

/// Upload a validated image and append it to the recipe.
///
/// The blob is written first; if the row cannot be inserted the blob is
/// removed again so storage never holds unreferenced objects.
pub async fn store_recipe_image(
    state: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    data: &[u8],
    kind: ImageKind,
) -> Result<RecipeImage, StoreImageError> {
    let path = image_path(user_id, recipe_id, kind.extension());
    state.storage.put(&path, data).await?;

    let inserted = match state.pool.get() {
        Ok(mut conn) => recipes::append_image(&mut conn, recipe_id, &path).map_err(Into::into),
        Err(e) => Err(StoreImageError::from(e)),
    };

    match inserted {
        Ok(image) => Ok(image),
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&path).await {
                tracing::warn!(path, "Failed to remove orphaned image blob: {}", cleanup);
            }
            Err(e)
        }
    }
}

/// Attach a fresh signed URL to an image row.
pub fn signed(state: &AppState, image: RecipeImage, size: Option<u32>) -> ImageDto {
    let url = state
        .signer
        .signed_url(&image.storage_path, size, Utc::now().timestamp());
    ImageDto {
        id: image.id,
        position: image.position,
        url,
        created_at: image.created_at,
    }
}
