//! Response extraction.
//!
//! Isolates the HTML document from raw model text by locating the first
//! `<!DOCTYPE html` and the last `</html>` after it (both ASCII
//! case-insensitive).

const START_MARKER: &str = "<!doctype html";
const END_MARKER: &str = "</html>";

/// Result of [`extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extraction<'a> {
    /// Extracted document, or the raw text when no start marker was found.
    pub body: &'a str,
    /// Start marker was found.
    pub has_start: bool,
    /// End marker was found after the start marker.
    pub has_end: bool,
}

impl Extraction<'_> {
    /// Both markers were found.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.has_start && self.has_end
    }
}

/// Extract the document from raw model text.
#[must_use]
pub fn extract(raw: &str) -> Extraction<'_> {
    // ASCII lowercasing keeps byte offsets aligned with `raw`.
    let lower = raw.to_ascii_lowercase();

    let Some(start) = lower.find(START_MARKER) else {
        return Extraction {
            body: raw,
            has_start: false,
            has_end: false,
        };
    };

    match lower[start..].rfind(END_MARKER) {
        Some(offset) => Extraction {
            body: &raw[start..start + offset + END_MARKER.len()],
            has_start: true,
            has_end: true,
        },
        None => Extraction {
            body: &raw[start..],
            has_start: true,
            has_end: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_strips_conversational_wrapping() {
        let raw = "Sure! <!DOCTYPE html><html><body>Hi</body></html> Hope that helps!";

        let extraction = extract(raw);

        assert_eq!(extraction.body, "<!DOCTYPE html><html><body>Hi</body></html>");
        assert!(extraction.is_well_formed());
    }

    #[test]
    fn test_markers_are_case_insensitive() {
        let raw = "```html\n<!doctype HTML>\n<HTML><body></body></HTML>\n```";

        assert_eq!(
            extract(raw).body,
            "<!doctype HTML>\n<HTML><body></body></HTML>"
        );
    }

    #[test]
    fn test_uses_last_end_marker() {
        let raw = "<!DOCTYPE html><html><pre>&lt;/html&gt; </html></pre></html>\ntrailer";

        assert_eq!(
            extract(raw).body,
            "<!DOCTYPE html><html><pre>&lt;/html&gt; </html></pre></html>"
        );
    }

    #[test]
    fn test_end_marker_before_start_is_ignored() {
        let raw = "</html> then <!DOCTYPE html><html>unterminated";

        let extraction = extract(raw);

        assert_eq!(extraction.body, "<!DOCTYPE html><html>unterminated");
        assert!(extraction.has_start);
        assert!(!extraction.has_end);
    }

    #[test]
    fn test_no_start_marker_returns_raw() {
        let raw = "I cannot help with that.";

        let extraction = extract(raw);

        assert_eq!(extraction.body, raw);
        assert!(!extraction.has_start);
        assert!(!extraction.is_well_formed());
    }

    #[test]
    fn test_non_ascii_content_preserved() {
        let raw = "Voilà: <!DOCTYPE html><html><p>Ünïcödé ✓</p></html> — fin";

        assert_eq!(
            extract(raw).body,
            "<!DOCTYPE html><html><p>Ünïcödé ✓</p></html>"
        );
    }
}
