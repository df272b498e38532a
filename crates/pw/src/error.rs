//! CLI error types.

use pw_config::ConfigError;
use pw_pages::PageError;
use pw_server::StartupError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Startup(#[from] StartupError),

    #[error("{0}")]
    Page(#[from] PageError),
}
