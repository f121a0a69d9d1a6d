use std::path::PathBuf;
use std::sync::Arc;

use agent_core::{HistoryStore, InMemoryHistoryStore, JsonFileHistoryStore, Orchestrator, TaskOutcome};
use anyhow::{bail, Result};
use clap::Args;
use tracing::{info, warn};

use crate::cli::context::CliContext;
use crate::cli::snapshot::open_fixture;
use crate::config::Provider;
use crate::llm::build_reasoner;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Natural-language task to perform
    pub task: String,

    /// Page fixture (JSON) to drive
    #[arg(short, long, value_name = "FILE")]
    pub page: PathBuf,

    /// Replay collaborator replies from this script instead of calling a provider
    #[arg(long, value_name = "FILE")]
    pub replies: Option<PathBuf>,

    /// Override the configured reasoning provider
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config().clone();
    if let Some(provider) = args.provider {
        config.provider = provider;
    }

    let service = build_reasoner(&config, args.replies.as_deref())?;
    let history: Arc<dyn HistoryStore> = match &config.history_path {
        Some(path) => Arc::new(JsonFileHistoryStore::new(path)),
        None => Arc::new(InMemoryHistoryStore::new()),
    };
    let orchestrator = Orchestrator::new(config.orchestrator(), service, history);
    let (bridge, tab) = open_fixture(ctx, &args.page).await?;

    let run = orchestrator.run(&tab, &args.task);
    tokio::pin!(run);
    let outcome = tokio::select! {
        outcome = &mut run => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; resetting session");
            orchestrator.reset(&tab).await?;
            run.await
        }
    };
    bridge.close_tab(tab.tab()).await?;
    info!(task = %outcome.task_id, success = outcome.success, "task finished");

    if !ctx.output().emit(&outcome)? {
        print_outcome(&outcome);
    }
    if !outcome.success {
        bail!(
            "task failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_outcome(outcome: &TaskOutcome) {
    let status = if outcome.success { "succeeded" } else { "failed" };
    println!("Task {} {} ({})", outcome.task_id, status, outcome.state);
    println!(
        "Steps completed: {}, retries: {}",
        outcome.steps_completed, outcome.retries
    );
    if let Some(text) = &outcome.final_text {
        println!("Result: {text}");
    }
    for (n, content) in outcome.extracted.iter().enumerate() {
        println!("Extracted #{}:\n{}", n + 1, content);
    }
    if let Some(error) = &outcome.error {
        println!("Error: {error}");
    }
}
