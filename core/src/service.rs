//! JSON-lines control channel.
//!
//! Inbound messages are read one JSON object per line and dispatched to the
//! manager; everything the manager publishes is written back as one
//! `Outbound` JSON object per line. Malformed lines are logged and skipped.

use std::io::{BufRead, Write};

use tracing::{debug, error, warn};

use crate::infrastructure::FeedbackSink;
use crate::manager::ReconciliationManager;
use crate::types::feedback::FeedbackEvent;
use crate::types::inventory::InventoryGraph;
use crate::types::protocol::{Inbound, Outbound};

/// Feedback sink writing `Outbound` messages as JSON lines.
pub struct JsonLinesSink<W> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        JsonLinesSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, message: &Outbound) {
        let line = match serde_json::to_string(message) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "cannot serialize outbound message");
                return;
            }
        };
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!(error = %e, "cannot write outbound message");
        }
    }
}

impl<W: Write> FeedbackSink for JsonLinesSink<W> {
    fn publish_feedback(&mut self, event: &FeedbackEvent) {
        self.emit(&Outbound::Feedback(event.clone()));
    }

    fn publish_inventory(&mut self, graph: &InventoryGraph) {
        self.emit(&Outbound::Inventory(graph.clone()));
    }
}

/// Counts of what a `serve` loop processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    pub handled: usize,
    pub skipped: usize,
}

/// Read inbound messages from `reader` until end of input.
pub fn serve<R: BufRead>(reader: R, manager: &ReconciliationManager) -> std::io::Result<ServeSummary> {
    let mut summary = ServeSummary::default();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Inbound>(line) {
            Ok(message) => {
                handle(manager, message);
                summary.handled += 1;
            }
            Err(e) => {
                warn!(error = %e, "malformed inbound message, skipping");
                summary.skipped += 1;
            }
        }
    }
    debug!(handled = summary.handled, skipped = summary.skipped, "input closed");
    Ok(summary)
}

fn handle(manager: &ReconciliationManager, message: Inbound) {
    match message {
        Inbound::Apply {
            activity_id,
            desired_state,
        } => {
            manager.apply(&activity_id, &desired_state);
        }
        Inbound::Command {
            activity_id,
            command,
        } => {
            manager.command(&activity_id, &command);
        }
        Inbound::Get { .. } => {
            if let Err(e) = manager.publish_inventory() {
                error!(error = %e, "cannot publish inventory");
            }
        }
    }
}
