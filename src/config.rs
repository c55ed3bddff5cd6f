//! Stage configuration parameters
//!
//! Each rotation stage is described by one [`StageConfig`], supplied by the
//! external configuration system at startup.  Everything except the angle is
//! immutable for the life of the process; the angle can be changed at runtime
//! through the management API and is then persisted.

use serde::{Deserialize, Serialize};

use crate::event::EventKind;

/// Maximum number of axis codes per stage (X slot, Y slot).
pub const MAX_CODES: usize = 2;

/// Configuration for one rotation stage instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Unique instance name, also the persistence key suffix.
    pub name: String,
    /// Event kind this stage acts on; other kinds pass through untouched.
    pub kind: EventKind,
    /// Ordered axis codes: `codes[0]` is the X slot, `codes[1]` the Y slot.
    pub codes: Vec<u16>,
    /// Rotation angle in degrees.  Accepted without range normalisation;
    /// out-of-range values behave as their radian conversion does.
    pub angle_degrees: i16,
    /// Idle window before a partial pair is flushed.
    pub timeout_ms: u32,
}

impl StageConfig {
    /// Validate structural invariants that must hold before registration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.is_empty() {
            return Err("name must not be empty");
        }
        if self.codes.is_empty() {
            return Err("codes must not be empty");
        }
        if self.codes.len() > MAX_CODES {
            return Err("codes length exceeds maximum of 2");
        }
        Ok(())
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            name: String::from("trackball"),
            kind: EventKind::Relative,
            codes: vec![0, 1], // REL_X, REL_Y
            angle_degrees: 0,
            timeout_ms: 50,
        }
    }
}
