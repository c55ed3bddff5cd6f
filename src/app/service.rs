//! Stage service — the hexagonal core.
//!
//! [`StageService`] owns the registry and the flush timer and serialises
//! the two execution contexts that touch per-stage state: the pipeline
//! thread delivering events into [`handle_event`](StageService::handle_event)
//! and the timer pump firing [`poll_timeouts`](StageService::poll_timeouts).
//!
//! ```text
//!  axis events ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                  │      StageService       │
//!  timer pump  ──▶ │  Registry · Rotor·Timer │ ◀─▶ StoragePort
//!                  └────────────────────────┘
//! ```
//!
//! Lock ordering: a stage cell lock may be held while taking the timer
//! table lock, never the reverse.  [`poll_timeouts`] therefore drains due
//! deadlines under the table lock alone, releases it, and only then locks
//! each affected stage.

use std::sync::{Mutex, PoisonError};

use log::{debug, info, warn};

use crate::config::StageConfig;
use crate::error::{Error, Result};
use crate::event::AxisEvent;
use crate::registry::{Registry, StageId};
use crate::rotor::Step;
use crate::timeout::{FlushTimer, TimeoutHandle};

use super::ports::{EventSink, StoragePort};

/// Settings namespace for persisted per-stage angles.
pub const SETTINGS_NAMESPACE: &str = "rotstage";

// ───────────────────────────────────────────────────────────────
// StageService
// ───────────────────────────────────────────────────────────────

/// Orchestrates all rotation-stage domain logic.
pub struct StageService {
    registry: Registry,
    timer: Mutex<FlushTimer>,
}

impl StageService {
    /// Build the service from the configured stage list.
    ///
    /// The registry capacity is fixed to the list length; a duplicate
    /// name or invalid configuration aborts construction.
    pub fn new(configs: Vec<StageConfig>) -> Result<Self> {
        let mut registry = Registry::with_capacity(configs.len());
        for config in configs {
            registry.register(config)?;
        }
        let timer = Mutex::new(FlushTimer::new(registry.capacity()));
        info!("stage service ready with {} stage(s)", registry.len());
        Ok(Self { registry, timer })
    }

    // ── Event path ────────────────────────────────────────────

    /// Feed one axis event into a stage.
    ///
    /// Never surfaces an error: bypassed events continue downstream with
    /// `event` untouched, buffered events leave with their value zeroed.
    /// Rotated output goes to `sink`.  `now_ms` is the caller's monotonic
    /// clock, shared with [`poll_timeouts`].
    pub fn handle_event(
        &self,
        id: StageId,
        event: &mut AxisEvent,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) {
        let Some(entry) = self.registry.entry(id) else {
            return;
        };
        let mut cell = entry
            .cell()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match cell.rotor.handle_event(entry.config(), event) {
            Step::Passed => {}
            Step::Buffered => {
                // Re-arm the idle window; only the latest event's
                // deadline matters.
                let handle = self
                    .timer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .schedule(id, now_ms, entry.config().timeout_ms);
                cell.timeout = Some(handle);
            }
            Step::Flushed(out) => {
                if let Some(handle) = cell.timeout.take() {
                    self.timer
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .cancel(handle);
                }
                for ev in &out {
                    sink.emit(ev);
                }
            }
        }
    }

    /// Fire every flush whose idle window has elapsed.
    ///
    /// Call from the timer pump context.  Deadlines are drained under the
    /// table lock alone; each stage is then flushed under its own lock,
    /// skipping any deadline the event path has since superseded.
    pub fn poll_timeouts(&self, now_ms: u64, sink: &mut impl EventSink) {
        let due = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take_due(now_ms);
        for handle in due {
            self.flush_if_current(handle, sink);
        }
    }

    fn flush_if_current(&self, handle: TimeoutHandle, sink: &mut impl EventSink) {
        let Some(entry) = self.registry.entry(handle.stage()) else {
            return;
        };
        let mut cell = entry
            .cell()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // A reschedule or pair-completion beat this fire to the lock.
        if cell.timeout != Some(handle) {
            debug!("stale flush deadline for '{}' ignored", entry.config().name);
            return;
        }
        cell.timeout = None;

        let out = cell.rotor.flush(entry.config());
        for ev in &out {
            sink.emit(ev);
        }
    }

    // ── Management API ────────────────────────────────────────

    /// Resolve a stage name to its id.
    pub fn lookup(&self, name: &str) -> Option<StageId> {
        self.registry.lookup(name)
    }

    /// Names of all registered stages.
    pub fn list_stages(&self) -> Result<Vec<String>> {
        self.registry.list_names()
    }

    /// Current angle of the named stage.
    pub fn get_angle(&self, name: &str) -> Result<i16> {
        let id = self.registry.lookup(name).ok_or(Error::NotFound)?;
        let entry = self.registry.entry(id).ok_or(Error::NotFound)?;
        let cell = entry
            .cell()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(cell.rotor.angle_degrees())
    }

    /// Update the named stage's angle and persist it.
    ///
    /// The live angle is committed before the persistence write is
    /// attempted; a write failure is reported once and does not roll the
    /// live value back.  No range normalisation is applied to `angle`.
    pub fn set_angle(
        &self,
        name: &str,
        angle: i16,
        storage: &mut impl StoragePort,
    ) -> Result<()> {
        let id = self.registry.lookup(name).ok_or(Error::NotFound)?;
        let entry = self.registry.entry(id).ok_or(Error::NotFound)?;

        let old = {
            let mut cell = entry
                .cell()
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let old = cell.rotor.angle_degrees();
            cell.rotor.set_angle(angle);
            old
        };
        info!("set angle for '{name}': {old} -> {angle}");

        let bytes = postcard::to_allocvec(&angle)
            .map_err(|_| Error::PersistenceWrite(super::ports::StorageError::IoError))?;
        if let Err(e) = storage.save(SETTINGS_NAMESPACE, name, &bytes) {
            warn!("failed to persist angle for '{name}': {e}");
            return Err(e.into());
        }
        debug!("persisted angle for '{name}': {angle}");
        Ok(())
    }

    /// Apply every persisted angle entry to its matching stage.
    ///
    /// Runs once at startup.  Uses the same update path as
    /// [`set_angle`](Self::set_angle) minus the write-back, so replay
    /// never amplifies into fresh persistence traffic.  Entries for
    /// unknown names or with undecodable payloads are discarded.
    pub fn replay_persisted(&self, storage: &impl StoragePort) {
        storage.for_each(SETTINGS_NAMESPACE, &mut |name, bytes| {
            let Some(id) = self.registry.lookup(name) else {
                debug!("replay: no stage named '{name}', entry discarded");
                return;
            };
            let angle = match postcard::from_bytes::<i16>(bytes) {
                Ok(a) => a,
                Err(_) => {
                    warn!("replay: undecodable angle entry for '{name}', discarded");
                    return;
                }
            };
            if let Some(entry) = self.registry.entry(id) {
                let mut cell = entry
                    .cell()
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                cell.rotor.set_angle(angle);
                info!("replayed persisted angle {angle} for '{name}'");
            }
        });
    }

    /// Number of armed flush deadlines (for diagnostics).
    pub fn armed_timeouts(&self) -> usize {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .armed_count()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    struct RecordingSink {
        events: Vec<AxisEvent>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { events: Vec::new() }
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&mut self, event: &AxisEvent) {
            self.events.push(*event);
        }
    }

    fn config(name: &str, angle: i16) -> StageConfig {
        StageConfig {
            name: name.into(),
            kind: EventKind::Relative,
            codes: vec![0, 1],
            angle_degrees: angle,
            timeout_ms: 50,
        }
    }

    fn service(angle: i16) -> StageService {
        StageService::new(vec![config("tb", angle)]).unwrap()
    }

    #[test]
    fn completed_pair_flushes_immediately() {
        let svc = service(90);
        let mut sink = RecordingSink::new();
        let id = svc.lookup("tb").unwrap();

        let mut x = AxisEvent::relative(0, 100, false);
        svc.handle_event(id, &mut x, 1_000, &mut sink);
        assert!(sink.events.is_empty());
        assert_eq!(svc.armed_timeouts(), 1);

        let mut y = AxisEvent::relative(1, 0, true);
        svc.handle_event(id, &mut y, 1_010, &mut sink);
        assert_eq!(sink.events.len(), 1);
        assert_eq!((sink.events[0].code, sink.events[0].value), (1, 100));

        // Pair completion disarmed the pending flush.
        assert_eq!(svc.armed_timeouts(), 0);
    }

    #[test]
    fn idle_window_flushes_partial_pair() {
        let svc = service(30);
        let mut sink = RecordingSink::new();
        let id = svc.lookup("tb").unwrap();

        let mut x = AxisEvent::relative(0, 50, false);
        svc.handle_event(id, &mut x, 1_000, &mut sink);

        svc.poll_timeouts(1_049, &mut sink);
        assert!(sink.events.is_empty());

        svc.poll_timeouts(1_050, &mut sink);
        assert_eq!(sink.events.len(), 2);
        assert_eq!((sink.events[0].code, sink.events[0].value), (0, 43));
        assert_eq!((sink.events[1].code, sink.events[1].value), (1, 25));
    }

    #[test]
    fn repeated_events_debounce_the_deadline() {
        let svc = service(90);
        let mut sink = RecordingSink::new();
        let id = svc.lookup("tb").unwrap();

        let mut a = AxisEvent::relative(0, 10, false);
        svc.handle_event(id, &mut a, 1_000, &mut sink);
        let mut b = AxisEvent::relative(0, 10, false);
        svc.handle_event(id, &mut b, 1_040, &mut sink);

        // Original deadline passed, replacement has not.
        svc.poll_timeouts(1_060, &mut sink);
        assert!(sink.events.is_empty());

        svc.poll_timeouts(1_090, &mut sink);
        assert_eq!(sink.events.len(), 1);
        assert_eq!((sink.events[0].code, sink.events[0].value), (1, 20));
    }

    #[test]
    fn set_then_get_angle() {
        let svc = service(0);
        let mut storage = MapStorage::new();
        svc.set_angle("tb", 270, &mut storage).unwrap();
        assert_eq!(svc.get_angle("tb").unwrap(), 270);
        assert_eq!(svc.get_angle("nope"), Err(Error::NotFound));
        assert_eq!(svc.set_angle("nope", 1, &mut storage), Err(Error::NotFound));
    }

    #[test]
    fn persistence_failure_keeps_live_value() {
        let svc = service(0);
        let mut storage = FailingStorage;
        let err = svc.set_angle("tb", 45, &mut storage).unwrap_err();
        assert!(matches!(err, Error::PersistenceWrite(_)));
        assert_eq!(svc.get_angle("tb").unwrap(), 45);
    }

    #[test]
    fn replay_applies_known_names_and_discards_unknown() {
        let mut storage = MapStorage::new();
        {
            let svc = service(0);
            svc.set_angle("tb", 90, &mut storage).unwrap();
        }
        storage
            .save(SETTINGS_NAMESPACE, "ghost", &[1, 2, 3])
            .unwrap();

        // Restart: fresh service, replay from the same storage.
        let svc = service(0);
        svc.replay_persisted(&storage);
        assert_eq!(svc.get_angle("tb").unwrap(), 90);
    }

    // ── Test doubles ──────────────────────────────────────────

    struct MapStorage {
        entries: Vec<(String, Vec<u8>)>,
    }

    impl MapStorage {
        fn new() -> Self {
            Self {
                entries: Vec::new(),
            }
        }
    }

    impl StoragePort for MapStorage {
        fn save(
            &mut self,
            namespace: &str,
            key: &str,
            data: &[u8],
        ) -> std::result::Result<(), crate::app::ports::StorageError> {
            let full = format!("{namespace}::{key}");
            self.entries.retain(|(k, _)| k != &full);
            self.entries.push((full, data.to_vec()));
            Ok(())
        }

        fn for_each(&self, namespace: &str, visit: &mut dyn FnMut(&str, &[u8])) {
            let prefix = format!("{namespace}::");
            for (k, v) in &self.entries {
                if let Some(name) = k.strip_prefix(&prefix) {
                    visit(name, v);
                }
            }
        }
    }

    struct FailingStorage;

    impl StoragePort for FailingStorage {
        fn save(
            &mut self,
            _namespace: &str,
            _key: &str,
            _data: &[u8],
        ) -> std::result::Result<(), crate::app::ports::StorageError> {
            Err(crate::app::ports::StorageError::Full)
        }

        fn for_each(&self, _namespace: &str, _visit: &mut dyn FnMut(&str, &[u8])) {}
    }
}
