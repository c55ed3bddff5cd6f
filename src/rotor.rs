//! Rotation engine — the per-instance pairing state machine.
//!
//! ```text
//!            axis event (matching kind + code)
//!                 │
//!   ┌──────┐      ▼       ┌─────────┐   pair complete   ┌───────┐
//!   │ IDLE │ ──────────▶  │ WAITING │ ────────────────▶ │ flush │
//!   └──────┘              └─────────┘   or timeout      └───┬───┘
//!      ▲                                                    │
//!      └────────────── slots reset to absent/zero ──────────┘
//! ```
//!
//! A [`Rotor`] accumulates the X and Y components of a motion sample,
//! rotates the completed pair by the configured angle, and hands back the
//! rotated events for emission.  It is a pure state machine: no locking,
//! no timers, no I/O.  The timer and mutual exclusion live in the service
//! layer, which calls [`Rotor::flush`] when the idle window elapses.

use core::f32::consts::PI;

use crate::config::{MAX_CODES, StageConfig};
use crate::event::AxisEvent;

// ───────────────────────────────────────────────────────────────
// Step outcome
// ───────────────────────────────────────────────────────────────

/// Rotated events produced by one flush.  At most one per slot.
pub type FlushOutput = heapless::Vec<AxisEvent, MAX_CODES>;

/// Outcome of feeding one event into the rotor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Bypass fast path: the event is untouched and continues downstream.
    Passed,
    /// The event was absorbed into a pending slot; its raw value has been
    /// zeroed.  The caller must (re)arm the flush timer.
    Buffered,
    /// The pair completed; the rotated events are ready to emit.  The
    /// caller must cancel any armed flush timer.
    Flushed(FlushOutput),
}

// ───────────────────────────────────────────────────────────────
// Pair phase
// ───────────────────────────────────────────────────────────────

/// Coarse state of the pairing machine, derived from the pending slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairPhase {
    /// No slot holds a sample.
    Idle,
    /// At least one slot is pending a partner or a timeout.
    Waiting,
}

// ───────────────────────────────────────────────────────────────
// Rotor
// ───────────────────────────────────────────────────────────────

/// Per-instance rotation state: the committed angle, its derived
/// coefficients, and the pending slot buffer.
#[derive(Debug)]
pub struct Rotor {
    angle_degrees: i16,
    cos_angle: f32,
    sin_angle: f32,
    pending_values: [i32; MAX_CODES],
    has_pending: [bool; MAX_CODES],
}

impl Rotor {
    pub fn new(angle_degrees: i16) -> Self {
        let (cos_angle, sin_angle) = coefficients(angle_degrees);
        Self {
            angle_degrees,
            cos_angle,
            sin_angle,
            pending_values: [0; MAX_CODES],
            has_pending: [false; MAX_CODES],
        }
    }

    /// The committed rotation angle in degrees.
    pub fn angle_degrees(&self) -> i16 {
        self.angle_degrees
    }

    /// Commit a new angle and recompute the coefficients in one step.
    /// The coefficients are never stale relative to the committed angle.
    pub fn set_angle(&mut self, angle_degrees: i16) {
        self.angle_degrees = angle_degrees;
        let (c, s) = coefficients(angle_degrees);
        self.cos_angle = c;
        self.sin_angle = s;
    }

    pub fn phase(&self) -> PairPhase {
        if self.has_pending.iter().any(|&p| p) {
            PairPhase::Waiting
        } else {
            PairPhase::Idle
        }
    }

    /// Feed one event into the pairing machine.
    ///
    /// Events bypass untouched when the angle is the identity, the kind
    /// does not match, or the code is not one of the configured slots.
    /// Matching events are accumulated (repeated same-code events sum)
    /// and their raw value zeroed, so nothing un-rotated escapes once
    /// the angle is nonzero.
    pub fn handle_event(&mut self, config: &StageConfig, event: &mut AxisEvent) -> Step {
        if self.angle_degrees == 0 || event.kind != config.kind {
            return Step::Passed;
        }
        let Some(slot) = config.codes.iter().position(|&c| c == event.code) else {
            return Step::Passed;
        };

        self.pending_values[slot] += event.value;
        self.has_pending[slot] = true;
        event.value = 0;

        let all_present = (0..config.codes.len()).all(|i| self.has_pending[i]);
        if all_present {
            Step::Flushed(self.flush(config))
        } else {
            Step::Buffered
        }
    }

    /// Rotate whatever is pending and reset the slots.
    ///
    /// A slot still absent contributes 0.  Rotated values are truncated
    /// toward zero, not rounded.  The X event is emitted only when its
    /// rotated value is nonzero, marked non-sync when a Y event follows;
    /// the Y event, when nonzero, always terminates the pair.
    pub fn flush(&mut self, config: &StageConfig) -> FlushOutput {
        let x_val = if self.has_pending[0] {
            self.pending_values[0]
        } else {
            0
        };
        let y_val = if config.codes.len() > 1 && self.has_pending[1] {
            self.pending_values[1]
        } else {
            0
        };
        let (x, y) = (x_val as f32, y_val as f32);

        let rotated_x = (x * self.cos_angle - y * self.sin_angle) as i32;
        let rotated_y = (x * self.sin_angle + y * self.cos_angle) as i32;

        self.pending_values = [0; MAX_CODES];
        self.has_pending = [false; MAX_CODES];

        let emit_y = config.codes.len() > 1 && rotated_y != 0;
        let mut out = FlushOutput::new();
        if rotated_x != 0 {
            out.push(AxisEvent::new(
                config.kind,
                config.codes[0],
                rotated_x,
                !emit_y,
            ))
            .ok();
        }
        if emit_y {
            out.push(AxisEvent::new(config.kind, config.codes[1], rotated_y, true))
                .ok();
        }
        out
    }
}

/// Degrees → (cos, sin) in f32, the precision the pipeline operates at.
fn coefficients(angle_degrees: i16) -> (f32, f32) {
    let rad = f32::from(angle_degrees) * PI / 180.0;
    (rad.cos(), rad.sin())
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn config(angle: i16) -> StageConfig {
        StageConfig {
            name: "test".into(),
            kind: EventKind::Relative,
            codes: vec![0, 1],
            angle_degrees: angle,
            timeout_ms: 50,
        }
    }

    #[test]
    fn zero_angle_passes_through_unchanged() {
        let cfg = config(0);
        let mut rotor = Rotor::new(0);
        let mut ev = AxisEvent::relative(0, 100, true);
        assert_eq!(rotor.handle_event(&cfg, &mut ev), Step::Passed);
        assert_eq!(ev.value, 100);
        assert_eq!(rotor.phase(), PairPhase::Idle);
    }

    #[test]
    fn mismatched_kind_passes_through() {
        let cfg = config(90);
        let mut rotor = Rotor::new(90);
        let mut ev = AxisEvent::new(EventKind::Absolute, 0, 42, true);
        assert_eq!(rotor.handle_event(&cfg, &mut ev), Step::Passed);
        assert_eq!(ev.value, 42);
    }

    #[test]
    fn unlisted_code_passes_through() {
        let cfg = config(90);
        let mut rotor = Rotor::new(90);
        let mut ev = AxisEvent::relative(8, 3, true); // wheel, not configured
        assert_eq!(rotor.handle_event(&cfg, &mut ev), Step::Passed);
        assert_eq!(ev.value, 3);
    }

    #[test]
    fn first_event_buffers_and_zeroes_raw_value() {
        let cfg = config(90);
        let mut rotor = Rotor::new(90);
        let mut ev = AxisEvent::relative(0, 100, false);
        assert_eq!(rotor.handle_event(&cfg, &mut ev), Step::Buffered);
        assert_eq!(ev.value, 0);
        assert_eq!(rotor.phase(), PairPhase::Waiting);
    }

    #[test]
    fn same_code_events_accumulate() {
        let cfg = config(90);
        let mut rotor = Rotor::new(90);
        let mut a = AxisEvent::relative(0, 30, false);
        let mut b = AxisEvent::relative(0, 70, false);
        assert_eq!(rotor.handle_event(&cfg, &mut a), Step::Buffered);
        assert_eq!(rotor.handle_event(&cfg, &mut b), Step::Buffered);

        let mut y = AxisEvent::relative(1, 0, true);
        match rotor.handle_event(&cfg, &mut y) {
            Step::Flushed(out) => {
                // 100 rotated by 90 degrees lands entirely on Y.
                assert_eq!(out.len(), 1);
                assert_eq!(out[0].code, 1);
                assert_eq!(out[0].value, 100);
                assert!(out[0].sync);
            }
            other => panic!("expected flush, got {other:?}"),
        }
    }

    #[test]
    fn quarter_turn_moves_x_onto_y() {
        let cfg = config(90);
        let mut rotor = Rotor::new(90);
        let mut x = AxisEvent::relative(0, 100, false);
        let mut y = AxisEvent::relative(1, 0, true);
        assert_eq!(rotor.handle_event(&cfg, &mut x), Step::Buffered);
        let Step::Flushed(out) = rotor.handle_event(&cfg, &mut y) else {
            panic!("pair should flush");
        };
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].code, out[0].value), (1, 100));
    }

    #[test]
    fn diagonal_at_45_collapses_onto_y() {
        let cfg = config(45);
        let mut rotor = Rotor::new(45);
        let mut x = AxisEvent::relative(0, 10, false);
        let mut y = AxisEvent::relative(1, 10, true);
        assert_eq!(rotor.handle_event(&cfg, &mut x), Step::Buffered);
        let Step::Flushed(out) = rotor.handle_event(&cfg, &mut y) else {
            panic!("pair should flush");
        };
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].code, out[0].value), (1, 14));
    }

    #[test]
    fn timeout_flush_treats_missing_slot_as_zero() {
        let cfg = config(30);
        let mut rotor = Rotor::new(30);
        let mut x = AxisEvent::relative(0, 50, false);
        assert_eq!(rotor.handle_event(&cfg, &mut x), Step::Buffered);

        let out = rotor.flush(&cfg);
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].code, out[0].value), (0, 43));
        assert!(!out[0].sync);
        assert_eq!((out[1].code, out[1].value), (1, 25));
        assert!(out[1].sync);
    }

    #[test]
    fn x_event_is_sync_when_y_drops_out() {
        // 180 degrees: x negates, y stays zero, so X terminates the pair.
        let cfg = config(180);
        let mut rotor = Rotor::new(180);
        let mut x = AxisEvent::relative(0, 7, false);
        assert_eq!(rotor.handle_event(&cfg, &mut x), Step::Buffered);
        let out = rotor.flush(&cfg);
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].code, out[0].value), (0, -7));
        assert!(out[0].sync);
    }

    #[test]
    fn flush_resets_slots() {
        let cfg = config(45);
        let mut rotor = Rotor::new(45);
        let mut x = AxisEvent::relative(0, 10, false);
        rotor.handle_event(&cfg, &mut x);
        let _ = rotor.flush(&cfg);
        assert_eq!(rotor.phase(), PairPhase::Idle);

        // A fresh pair after the flush sees no carry-over.
        let mut x2 = AxisEvent::relative(0, 10, false);
        let mut y2 = AxisEvent::relative(1, 10, true);
        rotor.handle_event(&cfg, &mut x2);
        let Step::Flushed(out) = rotor.handle_event(&cfg, &mut y2) else {
            panic!("pair should flush");
        };
        assert_eq!(out[0].value, 14);
    }

    #[test]
    fn single_code_stage_flushes_every_event() {
        let cfg = StageConfig {
            codes: vec![0],
            angle_degrees: 180,
            ..config(180)
        };
        let mut rotor = Rotor::new(180);
        let mut ev = AxisEvent::relative(0, 5, true);
        let Step::Flushed(out) = rotor.handle_event(&cfg, &mut ev) else {
            panic!("single-slot stage should flush immediately");
        };
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].code, out[0].value), (0, -5));
        assert!(out[0].sync);
    }

    #[test]
    fn set_angle_recomputes_coefficients() {
        let mut rotor = Rotor::new(0);
        rotor.set_angle(90);
        assert_eq!(rotor.angle_degrees(), 90);

        let cfg = config(90);
        let mut x = AxisEvent::relative(0, 100, false);
        let mut y = AxisEvent::relative(1, 0, true);
        rotor.handle_event(&cfg, &mut x);
        let Step::Flushed(out) = rotor.handle_event(&cfg, &mut y) else {
            panic!("pair should flush");
        };
        assert_eq!((out[0].code, out[0].value), (1, 100));
    }

    #[test]
    fn truncation_is_toward_zero() {
        // -30 degrees on (-50, 0): rotated_x = -43.30 -> -43, not -44.
        let cfg = config(-30);
        let mut rotor = Rotor::new(-30);
        let mut x = AxisEvent::relative(0, -50, false);
        rotor.handle_event(&cfg, &mut x);
        let out = rotor.flush(&cfg);
        assert_eq!((out[0].code, out[0].value), (0, -43));
        assert_eq!((out[1].code, out[1].value), (1, 25));
    }
}
