use clap::Subcommand;

use super::config::ConfigArgs;
use super::history::HistoryArgs;
use super::run::RunArgs;
use super::snapshot::SnapshotArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Index a page fixture and print its interactive elements
    Snapshot(SnapshotArgs),

    /// Drive a page fixture through a task with the reasoning service
    Run(RunArgs),

    /// Show stored conversation history
    History(HistoryArgs),

    /// Inspect tabpilot configuration
    Config(ConfigArgs),
}
