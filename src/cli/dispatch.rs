use super::config::cmd_config;
use super::env::CliArgs;
use super::history::cmd_history;
use super::run::cmd_run;
use super::snapshot::cmd_snapshot;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Snapshot(args) => cmd_snapshot(args, ctx).await,
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::History(args) => cmd_history(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
