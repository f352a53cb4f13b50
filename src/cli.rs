//! # zendocs CLI
//!
//! - `serve`: run the HTTP service.
//! - `generate`: document a local zip archive once and print the report.
//! - `render`: publish a stored document as PDF and print its URL.
//!
//! All commands accept `--config` pointing to an optional YAML file; secrets
//! always come from the environment (see [`crate::load_config`]).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::load_config::load_config;
use crate::object_store;
use crate::publish::Publisher;
use crate::server::{self, AppState};
use crate::workflow::Workflow;

#[derive(Parser)]
#[clap(
    name = "zendocs",
    version,
    about = "Generate markdown/PDF documentation for a zipped codebase with an LLM"
)]
pub struct Cli {
    /// Path to an optional YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve,
    /// Document a local zip archive
    Generate {
        /// Path to the zip archive
        #[clap(long)]
        archive: PathBuf,
    },
    /// Render a stored document to PDF and publish it
    Render {
        /// Name of the stored document (e.g. docs-....md)
        #[clap(long)]
        document: String,
    },
}

fn build_state(config_path: Option<&std::path::Path>) -> Result<AppState> {
    let config = load_config(config_path)?;
    let publisher = Publisher::new(
        object_store::from_config(&config.storage),
        config.renderings_dir(),
        config.theme.clone(),
    );
    let workflow = Workflow::from_config(config)?;
    Ok(AppState {
        workflow: Arc::new(workflow),
        publisher: Arc::new(publisher),
    })
}

/// Async entrypoint shared by `main` and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    let state = build_state(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            tracing::info!(command = "serve", "Starting HTTP service");
            server::serve(state).await?;
        }
        Commands::Generate { archive } => {
            tracing::info!(
                command = "generate",
                archive = %archive.display(),
                "Generating documentation"
            );
            let report = state.workflow.generate_from_archive(&archive).await?;
            println!(
                "Documentation generated: {} ({} of {} files documented)",
                report.document,
                report.successful_files(),
                report.processed_files()
            );
            for entry in &report.entries {
                println!("  [{:?}] {}", entry.status, entry.full_path);
            }
        }
        Commands::Render { document } => {
            tracing::info!(command = "render", document = %document, "Publishing document");
            let content = state.workflow.documents().load(&document).await?;
            let url = state.publisher.render_and_publish(&content).await?;
            println!("{url}");
        }
    }
    Ok(())
}
