//! Colored terminal output.
//!
//! Status lines go to stderr; page URLs go to stdout so scripts can capture
//! them (`pw generate ... | xargs open`).

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    status: Term,
    results: Term,
    green: Style,
    yellow: Style,
    red: Style,
    dim: Style,
    link: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            status: Term::stderr(),
            results: Term::stdout(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            dim: Style::new().dim(),
            link: Style::new().cyan().underlined(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.status.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.status.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.status.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.status.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print an indented `label: value` line with a dimmed label.
    pub(crate) fn field(&self, label: &str, value: &str) {
        let label = format!("{:<9}", format!("{label}:"));
        let _ = self
            .status
            .write_line(&format!("  {}{value}", self.dim.apply_to(label)));
    }

    /// Print a page URL on stdout.
    pub(crate) fn url(&self, url: &str) {
        let _ = self.results.write_line(&self.link.apply_to(url).to_string());
    }
}
