use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tunnelcheck",
    version,
    about = "VPN tunnel quality and leak-detection diagnostics: baseline, measure, detect, score"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full diagnostic suite and persist the report
    Run(RunArgs),
    /// Print the current tunnel-detection result
    Detect(DetectArgs),
    /// Smoke-test the collaborator HTTP API
    Smoke(SmokeArgs),
    /// Write a commented sample configuration file
    Init(InitArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Configuration file; built-in defaults are used when absent
    #[arg(long, default_value = "tunnelcheck.yaml")]
    pub config: PathBuf,

    /// Skip the no-tunnel baseline; comparisons report "unknown"
    #[arg(long)]
    pub skip_baseline: bool,

    /// Override the stability window (e.g. "90s", "5m"); "0s" disables
    #[arg(long, value_parser = humantime::parse_duration)]
    pub stability_duration: Option<std::time::Duration>,

    /// Directory for latest.json and the timestamped history entries
    #[arg(long, default_value = "reports")]
    pub output_dir: PathBuf,

    /// Print the report as JSON only, suppressing the text summary
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DetectArgs {
    /// Print the detection result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SmokeArgs {
    /// Base URL of the collaborator API
    #[arg(long)]
    pub base_url: String,

    #[arg(long, default_value = "smoke@tunnelcheck.dev")]
    pub email: String,

    #[arg(long, default_value = "smoke-password")]
    pub password: String,

    /// Print the step results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    /// Where to write the sample config
    #[arg(long, default_value = "tunnelcheck.yaml")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
