// Common helpers for engine operations

use std::sync::LazyLock;

use regex::Regex;

pub use crate::models::common::{new_id, now_iso};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Visible text of rich note content: tags stripped, common entities decoded
pub fn plain_text(content: &str) -> String {
    let stripped = TAG_RE.replace_all(content, "");
    stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// First `max` characters of a string, on char boundaries
pub fn prefix_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
