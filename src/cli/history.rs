use std::path::PathBuf;

use agent_core::{AgentRole, ConversationEntry, HistoryStore, JsonFileHistoryStore};
use anyhow::{Context, Result};
use clap::Args;
use tabpilot_core_types::TaskId;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct HistoryArgs {
    /// History file; defaults to `history_path` from the configuration
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Only entries of this task
    #[arg(long)]
    pub task: Option<TaskId>,

    /// Only entries exchanged with this collaborator role
    #[arg(long, value_parser = parse_role)]
    pub agent: Option<AgentRole>,

    /// Delete the stored history
    #[arg(long, conflicts_with_all = ["task", "agent"])]
    pub clear: bool,
}

pub async fn cmd_history(args: HistoryArgs, ctx: &CliContext) -> Result<()> {
    let path = args
        .file
        .or_else(|| ctx.config().history_path.clone())
        .context("no history file: pass --file or set history_path")?;
    let store = JsonFileHistoryStore::new(&path);

    if args.clear {
        store.clear().await?;
        println!("Cleared history at {}", path.display());
        return Ok(());
    }

    let entries: Vec<ConversationEntry> = match &args.task {
        Some(task) => store.entries_for(task, None, args.agent).await?,
        None => store
            .all()
            .await?
            .into_iter()
            .filter(|entry| args.agent.map_or(true, |agent| entry.agent == agent))
            .collect(),
    };

    if !ctx.output().emit(&entries)? {
        if entries.is_empty() {
            println!("No history entries in {}", path.display());
        }
        for entry in &entries {
            let step = entry
                .plan_step_id
                .as_ref()
                .map(|step| format!(" step={step}"))
                .unwrap_or_default();
            println!(
                "[{}] task={}{} {}/{:?}: {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.task_id,
                step,
                entry.agent,
                entry.role,
                entry.content
            );
        }
    }
    Ok(())
}

fn parse_role(raw: &str) -> Result<AgentRole, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "planner" => Ok(AgentRole::Planner),
        "executor" => Ok(AgentRole::Executor),
        "evaluator" => Ok(AgentRole::Evaluator),
        other => Err(format!("unknown agent role '{other}'")),
    }
}
