//! Unified error types for the rotation stage.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! management API's error handling uniform.  All variants are `Copy` so they
//! can be cheaply passed across the service boundary without allocation.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible management operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No registered instance carries the requested name.
    NotFound,
    /// Registration attempted with a name already in use.
    Duplicate,
    /// The registry's fixed capacity is exhausted.
    CapacityExceeded,
    /// Backing storage for a listing could not be acquired.
    AllocationFailure,
    /// The persistence backend rejected a write.  The live value is
    /// already committed when this is returned.
    PersistenceWrite(StorageError),
    /// An instance configuration is invalid (rejected before registration).
    InvalidConfig(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "instance not found"),
            Self::Duplicate => write!(f, "duplicate instance name"),
            Self::CapacityExceeded => write!(f, "registry capacity exceeded"),
            Self::AllocationFailure => write!(f, "allocation failure"),
            Self::PersistenceWrite(e) => write!(f, "persistence write failed: {e}"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::PersistenceWrite(e)
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
