use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_primitives::{PageRequest, PageResponse, PageState};
use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use clap::Args;
use dom_adapter::MemoryDocument;
use extensions_bridge::{PageBridge, TabHandle};
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct SnapshotArgs {
    /// Page fixture (JSON) to index
    pub page: PathBuf,

    /// Write the viewport capture to this PNG file
    #[arg(long, value_name = "FILE")]
    pub screenshot: Option<PathBuf>,
}

pub async fn cmd_snapshot(args: SnapshotArgs, ctx: &CliContext) -> Result<()> {
    let (bridge, tab) = open_fixture(ctx, &args.page).await?;
    let response = tab
        .request(PageRequest::GetPageState {
            capture_screenshot: args.screenshot.is_some(),
        })
        .await?;
    let state = expect_state(response)?;
    tab.request(PageRequest::ReleaseCycle { cycle: state.cycle })
        .await?;
    bridge.close_tab(tab.tab()).await?;

    if let (Some(path), Some(shot)) = (&args.screenshot, &state.screenshot) {
        let bytes = Base64.decode(shot).context("screenshot is not valid base64")?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "screenshot saved");
    }

    let mut printable = state.clone();
    printable.screenshot = None;
    if !ctx.output().emit(&printable)? {
        println!("URL: {}", state.url);
        if !state.title.is_empty() {
            println!("Title: {}", state.title);
        }
        println!("Interactive elements: {}", state.element_count);
        if !state.element_list.is_empty() {
            println!("{}", state.element_list);
        }
    }
    Ok(())
}

/// Loads a page fixture and opens it in a fresh bridge tab.
pub(crate) async fn open_fixture(
    ctx: &CliContext,
    path: &Path,
) -> Result<(Arc<PageBridge>, TabHandle)> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading page fixture {}", path.display()))?;
    let document = MemoryDocument::from_json(&raw)
        .with_context(|| format!("parsing page fixture {}", path.display()))?;
    let config = ctx.config();
    let bridge = PageBridge::new(config.bridge.clone(), config.executor.clone());
    let tab = bridge.open_tab(Arc::new(document));
    info!(tab = %tab.tab(), page = %path.display(), "page fixture opened");
    Ok((bridge, tab))
}

fn expect_state(response: PageResponse) -> Result<PageState> {
    match response {
        PageResponse::State(state) => Ok(state),
        PageResponse::Failed { error, .. } => bail!("page state unavailable: {error}"),
        other => bail!("unexpected page reply: {other:?}"),
    }
}
