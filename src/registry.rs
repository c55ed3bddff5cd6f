//! Instance registry — fixed-capacity arena with a name index.
//!
//! Stages are stored in a slot arena sized at construction time (the
//! capacity equals the number of configured instances, known before any
//! registration).  A name-to-index map gives O(1) lookup; internally
//! stages are identified by [`StageId`] indices, never by raw references.

use std::collections::HashMap;
use std::sync::Mutex;

use log::info;

use crate::config::StageConfig;
use crate::error::{Error, Result};
use crate::rotor::Rotor;
use crate::timeout::TimeoutHandle;

// ───────────────────────────────────────────────────────────────
// Identifiers and entries
// ───────────────────────────────────────────────────────────────

/// Index of a stage in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(pub usize);

/// Mutable per-stage state.
///
/// Guarded by one lock per stage: event delivery and timer firing both
/// run the sequence "inspect pending, decide flush or reschedule, mutate
/// pending and handle" and that sequence must be atomic.
#[derive(Debug)]
pub struct StageCell {
    pub rotor: Rotor,
    /// The live flush handle, if a flush is scheduled.
    pub timeout: Option<TimeoutHandle>,
}

/// One registered stage: immutable configuration plus locked state.
pub struct StageEntry {
    config: StageConfig,
    cell: Mutex<StageCell>,
}

impl StageEntry {
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn cell(&self) -> &Mutex<StageCell> {
        &self.cell
    }
}

// ───────────────────────────────────────────────────────────────
// Registry
// ───────────────────────────────────────────────────────────────

/// Fixed-capacity stage registry.
pub struct Registry {
    slots: Vec<StageEntry>,
    by_name: HashMap<String, usize>,
    capacity: usize,
}

impl Registry {
    /// Create an empty registry with room for `capacity` stages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            by_name: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// Register a stage.
    ///
    /// Fails with [`Error::InvalidConfig`] on a structurally invalid
    /// configuration, [`Error::Duplicate`] on a name collision (the
    /// existing stage is kept), and [`Error::CapacityExceeded`] when the
    /// arena is full.  All three are configuration-time conditions.
    pub fn register(&mut self, config: StageConfig) -> Result<StageId> {
        config.validate().map_err(Error::InvalidConfig)?;
        if self.by_name.contains_key(&config.name) {
            return Err(Error::Duplicate);
        }
        if self.slots.len() >= self.capacity {
            return Err(Error::CapacityExceeded);
        }

        let id = StageId(self.slots.len());
        info!(
            "registered stage '{}' (angle {} deg, timeout {} ms) at slot {}",
            config.name, config.angle_degrees, config.timeout_ms, id.0
        );
        self.by_name.insert(config.name.clone(), id.0);
        let cell = StageCell {
            rotor: Rotor::new(config.angle_degrees),
            timeout: None,
        };
        self.slots.push(StageEntry {
            config,
            cell: Mutex::new(cell),
        });
        Ok(id)
    }

    /// Look up a stage by name.
    pub fn lookup(&self, name: &str) -> Option<StageId> {
        self.by_name.get(name).copied().map(StageId)
    }

    /// Access a stage entry by id.
    pub fn entry(&self, id: StageId) -> Option<&StageEntry> {
        self.slots.get(id.0)
    }

    /// Snapshot of all registered names, in registration order.
    ///
    /// Fails with [`Error::AllocationFailure`] if the snapshot's backing
    /// storage cannot be acquired; the failure is propagated, never
    /// swallowed.
    pub fn list_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        names
            .try_reserve_exact(self.slots.len())
            .map_err(|_| Error::AllocationFailure)?;
        for entry in &self.slots {
            names.push(entry.config.name.clone());
        }
        Ok(names)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
