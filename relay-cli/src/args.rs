use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// Orchestrator defaults; a backend's channel options take precedence.
#[derive(Debug, Args, Clone)]
pub struct RuntimeArgs {
    /// Per-call timeout in milliseconds.
    #[arg(long, default_value_t = 30000)]
    pub timeout: u64,
    #[arg(long, default_value_t = 64)]
    pub max_concurrency: usize,
    #[arg(long, default_value_t = 4_194_304)]
    pub max_response_bytes: usize,
}
