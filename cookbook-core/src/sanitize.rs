//! Strip fetched HTML down to what the extraction model needs to see.

use regex::Regex;
use std::sync::LazyLock;

static NOISE_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<svg\b[^>]*>.*?</svg\s*>")
        .expect("static regex")
});

static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Default cap on sanitized content passed to the model, in bytes.
pub const MAX_SANITIZED_LEN: usize = 200_000;

/// Remove `<script>`, `<style>` and `<svg>` elements plus comments, then
/// collapse whitespace runs.
pub fn sanitize_html(html: &str) -> String {
    let stripped = NOISE_BLOCKS.replace_all(html, " ");
    let stripped = COMMENTS.replace_all(&stripped, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Truncate on a char boundary so the prompt stays within budget.
pub fn truncate(content: &str, max_len: usize) -> &str {
    if content.len() <= max_len {
        return content;
    }
    let mut end = max_len;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}
