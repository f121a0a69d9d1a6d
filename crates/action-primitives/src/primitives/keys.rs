//! Send-keys primitive - keyboard input to the focused field

use crate::{
    errors::ActionError,
    types::{ActionReport, ExecCtx},
};
use chrono::Utc;
use dom_adapter::DomEvent;
use std::time::Instant;
use tracing::{debug, info};

/// Execute send_keys primitive
///
/// Chords (`Control+a`) and named keys (`Enter`) become one `keydown` on the
/// focused field. A single character is appended to its value followed by
/// `input` and `change`. Without a focused input or textarea nothing happens.
pub async fn execute_send_keys(ctx: &ExecCtx, keys: &str) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    ctx.ensure_active()?;

    if keys.is_empty() {
        return Err(ActionError::InvalidAction("keys cannot be empty".to_string()));
    }

    let doc = &ctx.doc;
    let focused = doc
        .active_element()
        .filter(|node| matches!(doc.tag_name(*node).as_deref(), Some("input") | Some("textarea")));

    match focused {
        Some(node) if keys.contains('+') || keys.chars().count() > 1 => {
            doc.dispatch_event(node, DomEvent::key("keydown", keys))?;
        }
        Some(node) => {
            let mut value = doc.value(node).unwrap_or_default();
            value.push_str(keys);
            doc.set_value(node, &value)?;
            doc.dispatch_event(node, DomEvent::new("input"))?;
            doc.dispatch_event(node, DomEvent::new("change"))?;
        }
        None => debug!(action_id = %ctx.action_id, "no focused field; keys dropped"),
    }

    info!(action_id = %ctx.action_id, keys = %keys, "send_keys completed");
    Ok(ActionReport::success(started_at, start_instant.elapsed().as_millis() as u64))
}
