//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every rotated event to the
//! structured log.  The production pipeline would forward events to the
//! next input-processing stage instead; this adapter is the default for
//! the host runner and for watching a stage work from the console.

use log::info;

use crate::app::ports::EventSink;
use crate::event::AxisEvent;

/// Adapter that logs every emitted [`AxisEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AxisEvent) {
        info!(
            "EMIT | {:?} code={} value={}{}",
            event.kind,
            event.code,
            event.value,
            if event.sync { " [sync]" } else { "" },
        );
    }
}
