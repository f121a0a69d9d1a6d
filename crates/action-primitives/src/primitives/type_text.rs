//! Set-value primitive - per-character input into a form field

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx},
};
use chrono::Utc;
use dom_adapter::{DomEvent, LiveDocument, NodeId};
use perceiver_structural::{DomSnapshot, SnapshotId};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info};

/// Execute set_value primitive
///
/// Sequence on the located element: focus, `focus` and `input` events,
/// clear, then per character `keydown`, `keypress`, append, `input`,
/// `keyup` with the keystroke delay in between, and one final `change`.
pub async fn execute_set_value(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    snapshot: &DomSnapshot,
    node: SnapshotId,
    value: &str,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    ctx.ensure_active()?;

    info!(
        action_id = %ctx.action_id,
        %node,
        text_length = value.chars().count(),
        "executing set_value primitive"
    );

    let resolution = primitives.locate(ctx, snapshot, node).await?;
    let target = resolution.handle.node;
    let doc = resolution.handle.document.clone();

    if let Some(rect) = doc.bounding_box(target) {
        let (x, y) = rect.center();
        doc.move_pointer(x, y);
    }
    doc.set_highlight(target, true);
    let typed = type_into(primitives, doc.as_ref(), target, value).await;
    doc.set_highlight(target, false);
    typed?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    debug!(action_id = %ctx.action_id, latency_ms, "set_value completed");
    Ok(ActionReport::success(started_at, latency_ms).with_locator(resolution.strategy.name()))
}

async fn type_into(
    primitives: &DefaultActionPrimitives,
    doc: &dyn LiveDocument,
    target: NodeId,
    value: &str,
) -> Result<(), ActionError> {
    doc.focus(target)?;
    doc.dispatch_event(target, DomEvent::new("focus"))?;
    doc.dispatch_event(target, DomEvent::new("input"))?;
    if matches!(doc.tag_name(target).as_deref(), Some("input") | Some("textarea")) {
        doc.set_value(target, "")?;
    }

    let delay = primitives.keystroke_delay();
    let mut typed = doc.value(target).unwrap_or_default();
    for ch in value.chars() {
        let key = ch.to_string();
        doc.dispatch_event(target, DomEvent::key("keydown", key.clone()))?;
        doc.dispatch_event(target, DomEvent::key("keypress", key.clone()))?;
        typed.push(ch);
        doc.set_value(target, &typed)?;
        doc.dispatch_event(target, DomEvent::new("input"))?;
        doc.dispatch_event(target, DomEvent::key("keyup", key))?;
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
    doc.dispatch_event(target, DomEvent::new("change"))?;
    Ok(())
}
