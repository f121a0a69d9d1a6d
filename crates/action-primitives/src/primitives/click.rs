//! Activate primitive - pointer overlay, native click, synthetic fallback

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx},
};
use chrono::Utc;
use dom_adapter::DomEvent;
use perceiver_structural::{DomSnapshot, SnapshotId};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Execute activate primitive
///
/// Steps:
/// 1. Locate the element (scrolls it into view)
/// 2. Move the pointer overlay to its center and highlight it
/// 3. Native click; on failure dispatch mousedown, mouseup, click
/// 4. Drop the highlight and generate the action report
pub async fn execute_activate(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    snapshot: &DomSnapshot,
    node: SnapshotId,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    ctx.ensure_active()?;

    info!(action_id = %ctx.action_id, %node, "executing activate primitive");

    let resolution = primitives.locate(ctx, snapshot, node).await?;
    let target = &resolution.handle;
    let doc = &target.document;

    if let Some(rect) = doc.bounding_box(target.node) {
        let (x, y) = rect.center();
        doc.move_pointer(x, y);
    }
    doc.set_highlight(target.node, true);

    let clicked = match doc.click(target.node) {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!(action_id = %ctx.action_id, %err, "native click failed; dispatching synthetic events");
            ["mousedown", "mouseup", "click"]
                .into_iter()
                .try_for_each(|kind| doc.dispatch_event(target.node, DomEvent::new(kind)))
        }
    };
    doc.set_highlight(target.node, false);
    clicked?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    debug!(
        action_id = %ctx.action_id,
        latency_ms,
        located_by = resolution.strategy.name(),
        "activate completed"
    );
    Ok(ActionReport::success(started_at, latency_ms).with_locator(resolution.strategy.name()))
}
