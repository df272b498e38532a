//! Page name normalization.

/// Map a free-form page name to its canonical storage key.
///
/// ASCII letters and digits are lowercased, `-` and `_` are kept, and every
/// other character (including each non-ASCII character) becomes one `_`.
/// Empty input yields the empty key.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
