//! CLI command implementations.

pub(crate) mod delete;
pub(crate) mod generate;
pub(crate) mod list;
pub(crate) mod serve;

use std::path::PathBuf;

use clap::Args;
use pw_config::{CliSettings, Config, StorageBackend};

pub(crate) use delete::DeleteArgs;
pub(crate) use generate::GenerateArgs;
pub(crate) use list::ListArgs;
pub(crate) use serve::ServeArgs;

use crate::error::CliError;

/// Arguments shared by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover pw.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage backend (overrides config).
    #[arg(short, long)]
    backend: Option<StorageBackend>,

    /// Enable verbose output (info-level logs).
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl CommonArgs {
    /// Load config with the backend override and any extra CLI settings.
    pub(crate) fn load_config(&self, settings: CliSettings) -> Result<Config, CliError> {
        let settings = CliSettings {
            backend: self.backend.or(settings.backend),
            ..settings
        };
        Ok(Config::load(self.config.as_deref(), Some(&settings))?)
    }
}
