use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Enable debug mode (debug logging and saved screenshots)
    #[arg(short, long)]
    pub debug: bool,

    /// Output format
    #[arg(short, long, default_value = "human")]
    pub output: crate::cli::output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}
