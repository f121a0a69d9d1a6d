use std::time::Duration;

use tabpilot_core_types::CycleId;
use tracing::debug;

pub fn emit_snapshot(url: &str, nodes: usize, duration: Duration) {
    debug!(
        target: "perceiver.events",
        url,
        nodes,
        elapsed_ms = duration.as_millis() as u64,
        "structural.snapshot.completed"
    );
}

pub fn emit_index(url: &str, cycle: CycleId, indexed: usize) {
    debug!(
        target: "perceiver.events",
        url,
        %cycle,
        indexed,
        "structural.index.completed"
    );
}
