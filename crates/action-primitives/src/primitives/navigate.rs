//! Navigation primitives - go to url, search, history back

use crate::{
    errors::ActionError,
    types::{ActionReport, ExecCtx},
};
use chrono::Utc;
use std::time::Instant;
use tracing::info;
use url::Url;

pub const SEARCH_ENDPOINT: &str = "https://www.google.com/search";

/// Search results URL for `query`.
pub fn search_url(query: &str) -> Result<String, ActionError> {
    let url = Url::parse_with_params(SEARCH_ENDPOINT, &[("q", query)])
        .map_err(|err| ActionError::Internal(format!("failed to build search url: {err}")))?;
    Ok(url.to_string())
}

pub async fn execute_navigate(ctx: &ExecCtx, url: &str) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    ctx.ensure_active()?;

    if url.trim().is_empty() {
        return Err(ActionError::InvalidAction("url cannot be empty".to_string()));
    }

    info!(action_id = %ctx.action_id, url = %url, "executing navigate primitive");
    ctx.doc.navigate(url.trim())?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(
        action_id = %ctx.action_id,
        latency_ms,
        url_after = %ctx.doc.url(),
        "navigate completed"
    );
    Ok(ActionReport::success(started_at, latency_ms))
}

pub async fn execute_search(ctx: &ExecCtx, query: &str) -> Result<ActionReport, ActionError> {
    let url = search_url(query)?;
    execute_navigate(ctx, &url).await
}

pub async fn execute_go_back(ctx: &ExecCtx) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    ctx.ensure_active()?;

    let moved = ctx.doc.history_back()?;
    info!(action_id = %ctx.action_id, moved, "go_back completed");
    Ok(ActionReport::success(started_at, start_instant.elapsed().as_millis() as u64))
}
