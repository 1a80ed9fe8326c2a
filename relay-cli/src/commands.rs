use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a gateway config and initialize every backend and service.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Build one service's wire request without sending it.
    Render {
        path: PathBuf,
        #[arg(long)]
        backend: String,
        #[arg(long)]
        service: String,
        /// JSON or YAML ambient document for the request block.
        #[arg(long)]
        context: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run a logical request document against the configured backends.
    Execute {
        path: PathBuf,
        request: PathBuf,
        /// Print lifecycle events to stdout as JSON lines.
        #[arg(long)]
        events: bool,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        runtime: RuntimeArgs,
    },
}
