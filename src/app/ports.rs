//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ StageService (domain)
//! ```
//!
//! Driven adapters (event sinks, settings storage, the timer pump)
//! implement these traits.  The [`StageService`](super::service::StageService)
//! consumes them at call sites, so the domain core never touches an event
//! bus or flash storage directly.  All port errors are typed; callers must
//! handle every variant explicitly.

use crate::event::AxisEvent;
use crate::registry::StageId;
use crate::timeout::TimeoutHandle;

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → downstream pipeline)
// ───────────────────────────────────────────────────────────────

/// The domain emits rotated [`AxisEvent`]s through this port.  Adapters
/// decide where they go (next pipeline stage, serial log, test buffer).
pub trait EventSink {
    fn emit(&mut self, event: &AxisEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ settings backend)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for per-stage angles.
///
/// Keys are namespaced to prevent collisions between subsystems.  Writes
/// must be atomic; a failed write leaves the previous value intact.
pub trait StoragePort {
    /// Write a value atomically.
    fn save(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Visit every stored `(key, value)` pair under `namespace`.
    /// Invoked once at startup for persistence replay.
    fn for_each(&self, namespace: &str, visit: &mut dyn FnMut(&str, &[u8]));
}

// ───────────────────────────────────────────────────────────────
// Flush delegate (decouples the timer from stage state)
// ───────────────────────────────────────────────────────────────

/// Callback trait the flush timer invokes when a deadline passes.
///
/// This decouples the [`FlushTimer`](crate::timeout::FlushTimer) from the
/// stages it serves.  The service implements it by flushing the stage's
/// pending pair, but the timer knows nothing about rotors or locks.
pub trait FlushDelegate {
    /// Called when the idle window for `stage` has elapsed.
    ///
    /// `handle` identifies the deadline that fired; implementations must
    /// ignore it if the stage has since rescheduled or flushed.
    fn on_flush_due(&mut self, stage: StageId, handle: TimeoutHandle);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Storage partition is full.
    Full,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
