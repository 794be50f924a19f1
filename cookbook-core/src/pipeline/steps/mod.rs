//! Pipeline step implementations.
//!
//! Steps that only need HTTP and the LLM are implemented here. Steps that
//! touch the database only carry metadata; the server implements them.

mod extract_recipe;
mod fetch_html;
mod fetch_images;
mod sanitize_html;
mod save_recipe;

pub use extract_recipe::ExtractRecipeStep;
pub use fetch_html::FetchHtmlStep;
pub use fetch_images::FetchImagesStepMeta;
pub use sanitize_html::SanitizeHtmlStep;
pub use save_recipe::SaveRecipeStepMeta;
