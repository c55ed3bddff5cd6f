//! Axis event model.
//!
//! An [`AxisEvent`] is one motion sample travelling through the input
//! pipeline: an event kind, an axis code, a signed displacement, and a
//! `sync` flag marking the last event of a logically grouped sample.
//! Downstream consumers accumulate non-sync events and apply the whole
//! group when the sync event arrives.

use serde::{Deserialize, Serialize};

/// Classification of axis events an instance acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Relative displacement (mouse/trackball deltas).
    Relative,
    /// Absolute position (touch surfaces).
    Absolute,
}

/// A single axis motion sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisEvent {
    pub kind: EventKind,
    /// Axis code (e.g. 0 = X, 1 = Y in the REL numbering).
    pub code: u16,
    pub value: i32,
    /// True when this event terminates a grouped motion sample.
    pub sync: bool,
}

impl AxisEvent {
    pub fn new(kind: EventKind, code: u16, value: i32, sync: bool) -> Self {
        Self {
            kind,
            code,
            value,
            sync,
        }
    }

    /// Shorthand for a relative sample, the common case in pointing pipelines.
    pub fn relative(code: u16, value: i32, sync: bool) -> Self {
        Self::new(EventKind::Relative, code, value, sync)
    }
}
