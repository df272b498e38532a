//! Prompt composition.
//!
//! Builds the generation instruction for either mode:
//!
//! - **Update**: the existing document is quoted verbatim and the model is told
//!   to apply only the requested change.
//! - **Create**: the model is asked for a complete, self-contained document.
//!
//! Both modes require the output to start with `<!DOCTYPE html>` and end with
//! `</html>`, which is what the extractor looks for.

use std::fmt::Write;

/// Default page kind used in creation prompts.
pub const DEFAULT_PAGE_KIND: &str = "landing";

const OUTPUT_RULES: &str = "\
Return ONLY the complete HTML code, nothing else. Do not add any explanation, \
preamble or closing remarks before or after the document. \
Start your response with <!DOCTYPE html> and end it with </html>.";

/// Builds generation prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptComposer {
    page_kind: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_KIND)
    }
}

impl PromptComposer {
    /// Create a composer for pages of `page_kind` (e.g., "landing").
    #[must_use]
    pub fn new(page_kind: impl Into<String>) -> Self {
        Self {
            page_kind: page_kind.into(),
        }
    }

    /// Page kind used in creation prompts.
    #[must_use]
    pub fn page_kind(&self) -> &str {
        &self.page_kind
    }

    /// Compose the prompt for `instruction`.
    ///
    /// `existing` selects update mode. Non-empty `siblings` add a request to
    /// link to those pages.
    #[must_use]
    pub fn compose(&self, instruction: &str, existing: Option<&str>, siblings: &[String]) -> String {
        self.compose_as(None, instruction, existing, siblings)
    }

    /// Like [`compose`](Self::compose), with `kind` replacing the configured
    /// page kind when it is non-blank.
    #[must_use]
    pub fn compose_as(
        &self,
        kind: Option<&str>,
        instruction: &str,
        existing: Option<&str>,
        siblings: &[String],
    ) -> String {
        let kind = kind
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(&self.page_kind);
        let mut prompt = String::from("You are an expert web developer. ");

        match existing {
            Some(body) => {
                let _ = write!(
                    prompt,
                    "Update this existing HTML page with the following change: {instruction}\n\n\
                     Current HTML to modify:\n{body}\n\n\
                     Important:\n\
                     - Apply ONLY the requested change. Leave every other part of the page \
                     (content, structure, styling and scripts) exactly as it is.\n\
                     - Return the complete updated page, not a fragment or a diff.\n"
                );
            }
            None => {
                let _ = write!(
                    prompt,
                    "Create a complete, modern, responsive {kind} page based on these \
                     instructions: {instruction}\n\n\
                     Requirements:\n\
                     - Create a single HTML file with embedded CSS and JavaScript\n\
                     - Make it fully responsive and mobile-friendly\n\
                     - Use modern CSS (flexbox, grid, animations)\n\
                     - Include semantic HTML5 elements\n\
                     - Use a professional color scheme and typography\n\
                     - Include all necessary meta tags for SEO\n\
                     - Add viewport meta tag for mobile responsiveness\n"
                );
            }
        }

        let siblings: Vec<&str> = siblings
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if !siblings.is_empty() {
            let _ = write!(
                prompt,
                "\nThis page is part of a website with these other pages: {}. \
                 Add appropriate navigation or links to these pages where relevant.\n",
                siblings.join(", ")
            );
        }

        prompt.push('\n');
        prompt.push_str(OUTPUT_RULES);
        prompt
    }
}
