//! Filesystem-safe names for managed library copies.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum length for the normalized stem.
const MAX_STEM_LENGTH: usize = 96;

/// Regex for runs of characters outside `[A-Za-z0-9._-]`.
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._\-]+").expect("static regex"));

/// Regex for consecutive separators.
static CONSECUTIVE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_]{2,}").expect("static regex"));

/// Normalize a library file name while keeping its extension.
///
/// # Rules Applied
/// 1. Replace unsafe character runs (spaces, separators, quotes) with `_`
/// 2. Collapse consecutive separators
/// 3. Trim leading dots and separators so the result is never hidden
/// 4. Truncate the stem to `MAX_STEM_LENGTH`
/// 5. Fall back to `library` when nothing is left
///
/// # Examples
///
/// ```
/// use injector_core::registry::normalize_library_name;
///
/// assert_eq!(normalize_library_name("libfrida gadget.so"), "libfrida_gadget.so");
/// assert_eq!(normalize_library_name("../../evil.so"), "evil.so");
/// ```
pub fn normalize_library_name(file_name: &str) -> String {
    let (stem, ext) = match file_name.rfind('.') {
        Some(pos) if pos > 0 => (&file_name[..pos], &file_name[pos..]),
        _ => (file_name, ""),
    };

    let mut stem = UNSAFE_CHARS.replace_all(stem, "_").to_string();
    stem = CONSECUTIVE_SEPARATORS.replace_all(&stem, "_").to_string();
    stem = stem
        .trim_matches(|c| c == '.' || c == '-' || c == '_')
        .to_string();

    if stem.len() > MAX_STEM_LENGTH {
        // Only ASCII survives the regex, so byte slicing is safe here
        stem.truncate(MAX_STEM_LENGTH);
        stem = stem.trim_end_matches(['-', '_', '.']).to_string();
    }

    if stem.is_empty() {
        stem = "library".to_string();
    }

    let ext = UNSAFE_CHARS.replace_all(ext, "").to_lowercase();
    format!("{}{}", stem, ext)
}
