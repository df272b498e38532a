//! `pw delete` command implementation.

use clap::Args;
use pw_config::CliSettings;
use pw_server::build_service;

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the delete command.
#[derive(Args)]
pub(crate) struct DeleteArgs {
    #[command(flatten)]
    pub(crate) common: CommonArgs,

    /// Page name; normalized into the storage key.
    #[arg(short, long)]
    name: String,
}

impl DeleteArgs {
    /// Execute the delete command.
    ///
    /// # Errors
    ///
    /// Returns an error if the page does not exist or storage fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.common.load_config(CliSettings::default())?;
        let service = build_service(&config).await?;
        let key = service.delete(&self.name).await?;

        output.success(&format!("Deleted page {key}"));
        Ok(())
    }
}
