//! Shared utility helpers.

use std::path::{Path, PathBuf};

/// Truncate a string to `max` chars, appending `…` if trimmed.
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

/// Resolve `raw` against `base` unless it is already absolute.
pub fn resolve_against(base: &Path, raw: &str) -> PathBuf {
    let p = Path::new(raw);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Resolve an env-var reference (`$NAME`) to its value.
///
/// Plain strings are returned unchanged.  An unset variable resolves to
/// an empty string so callers can treat it as "not configured".
pub fn resolve_env_ref(raw: &str) -> String {
    match raw.strip_prefix('$') {
        Some(var) => std::env::var(var).unwrap_or_default(),
        None => raw.to_string(),
    }
}
