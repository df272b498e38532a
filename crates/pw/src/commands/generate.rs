//! `pw generate` command implementation.

use clap::Args;
use pw_config::CliSettings;
use pw_pages::{GenerateRequest, Generated};
use pw_server::build_service;

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the generate command.
#[derive(Args)]
pub(crate) struct GenerateArgs {
    #[command(flatten)]
    pub(crate) common: CommonArgs,

    /// Page name; normalized into the storage key.
    #[arg(short, long)]
    name: String,

    /// What to build, or what to change on an existing page.
    #[arg(short, long)]
    instructions: String,

    /// Other page names to link to (repeatable).
    #[arg(short, long = "sibling")]
    pub(crate) siblings: Vec<String>,

    /// Page kind for a new page (overrides `pages.kind`).
    #[arg(long)]
    pub(crate) page_type: Option<String>,
}

impl GenerateArgs {
    /// Execute the generate command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, generation or publishing fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.common.load_config(CliSettings::default())?;
        let generator = config.require_generator()?;
        let service = build_service(&config).await?;

        if !service.storage().is_persistent() {
            output.warning(
                "Storage is in-memory: the page will be lost when this command exits \
                 (use --backend fs, s3 or sql)",
            );
        }
        output.info(&format!(
            "Generating \"{}\" with {}...",
            self.name, generator.model
        ));

        let generated = service
            .generate(&GenerateRequest {
                page_name: self.name,
                instructions: self.instructions,
                sibling_pages: self.siblings,
                page_kind: self.page_type,
            })
            .await?;

        print_generated(&output, &generated);
        Ok(())
    }
}

fn print_generated(output: &Output, generated: &Generated) {
    if generated.created {
        output.success("\nPage created!");
    } else {
        output.success("\nPage updated!");
    }
    output.field("Key", &generated.canonical_key);
    output.field("Title", &generated.metadata.title);
    output.url(&generated.public_url);

    if !generated.well_formed {
        output.warning(
            "\nWarning: model output was not a complete HTML document; it was published as returned",
        );
    }
}
