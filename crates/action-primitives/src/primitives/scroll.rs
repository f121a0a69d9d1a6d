//! Scroll primitive - scroll the page by an amount or one viewport

use crate::{
    errors::ActionError,
    types::{ActionReport, ExecCtx, ScrollDirection},
};
use chrono::Utc;
use std::time::Instant;
use tracing::info;

/// Execute scroll primitive
///
/// Without an explicit amount the page moves by one viewport height.
pub async fn execute_scroll(
    ctx: &ExecCtx,
    direction: ScrollDirection,
    amount: Option<f64>,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    ctx.ensure_active()?;

    let distance = match amount {
        Some(px) if px.is_finite() && px > 0.0 => px,
        Some(px) => {
            return Err(ActionError::InvalidAction(format!(
                "scroll amount must be positive, got {px}"
            )))
        }
        None => ctx.doc.viewport().height,
    };
    let dy = match direction {
        ScrollDirection::Down => distance,
        ScrollDirection::Up => -distance,
    };
    ctx.doc.scroll_by(0.0, dy);

    info!(
        action_id = %ctx.action_id,
        direction = ?direction,
        dy,
        scroll_y = ctx.doc.viewport().scroll_y,
        "scroll completed"
    );
    Ok(ActionReport::success(started_at, start_instant.elapsed().as_millis() as u64))
}
