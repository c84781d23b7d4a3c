use std::path::Path;

use anyhow::{Context, Result};

/// One topic per line; blank lines and `#` comments are skipped.
pub fn parse_topics(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn read_topics_file(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read topics file {:?}", path))?;
    Ok(parse_topics(&raw))
}
