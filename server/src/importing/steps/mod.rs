//! Server implementations of the DB-backed pipeline steps.

mod fetch_images;
mod save_recipe;

pub use fetch_images::FetchImagesStep;
pub use save_recipe::SaveRecipeStep;
