//! `pw serve` command implementation.

use clap::Args;
use pw_config::CliSettings;
use pw_server::{build_service, run_server, server_config_from_pw_config};

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    #[command(flatten)]
    pub(crate) common: CommonArgs,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.common.load_config(CliSettings {
            host: self.host,
            port: self.port,
            backend: None,
        })?;
        let generator = config.require_generator()?;

        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!("Model: {}", generator.model));
        output.info(&format!("Storage backend: {}", config.storage.backend));
        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }

        let service = build_service(&config).await?;
        if !service.storage().is_persistent() {
            output.warning("Storage is in-memory: pages will be lost when the server stops");
        }

        run_server(server_config_from_pw_config(&config), service).await?;

        Ok(())
    }
}
