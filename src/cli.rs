use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "peek",
    version,
    about = "A two-pane terminal dashboard for Kubernetes clusters."
)]
pub struct CliArgs {
    /// UI tick interval in milliseconds
    #[arg(long, default_value_t = 1_000)]
    pub tick_ms: u64,

    /// Start in a specific namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Start with this kubeconfig context instead of current-context
    #[arg(long)]
    pub context: Option<String>,

    /// Path to a peek.yaml config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append tracing output to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
