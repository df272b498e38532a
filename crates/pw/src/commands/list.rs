//! `pw list` command implementation.

use clap::Args;
use pw_config::CliSettings;
use pw_server::build_service;

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Arguments for the list command.
#[derive(Args)]
pub(crate) struct ListArgs {
    #[command(flatten)]
    pub(crate) common: CommonArgs,
}

impl ListArgs {
    /// Execute the list command.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.common.load_config(CliSettings::default())?;
        let service = build_service(&config).await?;
        let pages = service.list().await?;

        if pages.is_empty() {
            output.info("No pages published.");
            return Ok(());
        }

        output.info(&format!("{} page(s), newest first\n", pages.len()));
        for page in &pages {
            output.success(&page.canonical_key);
            output.field("Title", &page.title);
            output.field("Created", &page.created_at.format(TIME_FORMAT).to_string());
            output.field("Updated", &page.updated_at.format(TIME_FORMAT).to_string());
            output.url(&page.page_url);
        }

        Ok(())
    }
}
