//! Flush timer engine.
//!
//! The timer is decoupled from the stages it serves: when a deadline
//! passes, it notifies a [`FlushDelegate`] instead of touching stage
//! state directly.  The service implements the delegate by flushing the
//! stage's rotor, but the timer itself knows nothing about rotors,
//! events, or locks.  That keeps it independently testable and keeps the
//! lock ordering simple (timer table lock is never held while a stage
//! lock is taken).
//!
//! Handles are generation-stamped so a reschedule invalidates its
//! predecessor: a fired or cancelled handle that no longer matches the
//! live one is simply ignored.

use log::debug;

use crate::app::ports::FlushDelegate;
use crate::registry::StageId;

// ═══════════════════════════════════════════════════════════════
//  Handle
// ═══════════════════════════════════════════════════════════════

/// Opaque handle to one scheduled flush.
///
/// Equality compares both slot and generation, so a handle kept across a
/// reschedule never matches the live deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutHandle {
    slot: usize,
    generation: u32,
}

impl TimeoutHandle {
    pub fn stage(&self) -> StageId {
        StageId(self.slot)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Timer engine
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct Deadline {
    due_at_ms: u64,
    generation: u32,
}

/// Deadline table with one slot per stage.
///
/// At most one deadline is live per stage: scheduling replaces any
/// earlier one (debounce, not accumulate).  Cancellation is idempotent,
/// a stale handle is a no-op.
pub struct FlushTimer {
    deadlines: Vec<Option<Deadline>>,
    next_generation: u32,
}

impl FlushTimer {
    /// Create a timer with one deadline slot per registry slot.
    pub fn new(capacity: usize) -> Self {
        Self {
            deadlines: vec![None; capacity],
            next_generation: 0,
        }
    }

    /// Arm (or re-arm) the flush deadline for `stage`.
    ///
    /// Replaces any existing deadline; only the most recent event's
    /// window matters.
    pub fn schedule(&mut self, stage: StageId, now_ms: u64, delay_ms: u32) -> TimeoutHandle {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.deadlines[stage.0] = Some(Deadline {
            due_at_ms: now_ms + u64::from(delay_ms),
            generation,
        });
        TimeoutHandle {
            slot: stage.0,
            generation,
        }
    }

    /// Cancel a scheduled flush.  No-op when the handle has already
    /// fired, been cancelled, or been superseded by a reschedule.
    pub fn cancel(&mut self, handle: TimeoutHandle) {
        if let Some(deadline) = self.deadlines[handle.slot] {
            if deadline.generation == handle.generation {
                self.deadlines[handle.slot] = None;
            }
        }
    }

    /// Remove and return every deadline that is due at `now_ms`.
    ///
    /// Separated from [`tick`](Self::tick) so callers can release the
    /// table lock before firing the delegate.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<TimeoutHandle> {
        let mut due = Vec::new();
        for (slot, entry) in self.deadlines.iter_mut().enumerate() {
            if let Some(deadline) = *entry {
                if deadline.due_at_ms <= now_ms {
                    *entry = None;
                    due.push(TimeoutHandle {
                        slot,
                        generation: deadline.generation,
                    });
                }
            }
        }
        due
    }

    /// Fire every due deadline through the delegate.
    pub fn tick(&mut self, now_ms: u64, delegate: &mut dyn FlushDelegate) {
        for handle in self.take_due(now_ms) {
            debug!("flush timer fired for stage {}", handle.slot);
            delegate.on_flush_due(handle.stage(), handle);
        }
    }

    /// Number of armed deadlines (for diagnostics).
    pub fn armed_count(&self) -> usize {
        self.deadlines.iter().filter(|d| d.is_some()).count()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
