//! Shared helpers: timestamps, slugs, excerpts.

use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Lowercase-hyphenation: every run of non-alphanumeric characters collapses
/// into a single hyphen, with no leading or trailing hyphens.
/// "Hello World!" becomes "hello-world".
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

fn tag_pattern() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"))
}

/// Strips HTML tags from `content` and truncates to at most `limit`
/// characters, appending an ellipsis when anything was cut off.
pub fn derive_excerpt(content: &str, limit: usize) -> String {
    let stripped = tag_pattern().replace_all(content, "");
    let text = stripped.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let truncated: String = text.chars().take(limit).collect();
    format!("{}...", truncated.trim_end())
}
