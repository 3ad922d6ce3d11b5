//! ID generation utilities for installr
//!
//! Provides functions for generating unique run identifiers and tool slugs.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Generate a unique run ID
///
/// Format: `run-{timestamp_ms}-{random_hex}`
/// Example: `run-1738300800123-a1b2`
pub fn generate_run_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("run-{}-{:04x}", timestamp, random)
}

/// Derive a stable tool ID from a source URL.
///
/// Takes the last path segment, strips a trailing `.git`, and lowercases.
/// Example: `https://github.com/BurntSushi/ripgrep.git` -> `ripgrep`
pub fn tool_id_from_url(source_url: &str) -> String {
    let trimmed = source_url.trim_end_matches('/');
    let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let segment = segment.strip_suffix(".git").unwrap_or(segment);
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}
