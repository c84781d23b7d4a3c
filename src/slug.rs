use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static UNSAFE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\-]").unwrap());

/// URL-safe page name the renderer derives from a title.
/// Returns `None` when nothing survives the filter.
pub fn slugify(title: &str) -> Option<String> {
    let lower = title.to_lowercase();
    let dashed = WHITESPACE_RE.replace_all(&lower, "-");
    let slug = UNSAFE_RE.replace_all(&dashed, "").into_owned();
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// `slugify`, or the renderer's timestamp fallback.
pub fn slug_or_fallback(title: &str) -> String {
    slugify(title)
        .unwrap_or_else(|| format!("article-{}", chrono::Utc::now().timestamp_millis()))
}
