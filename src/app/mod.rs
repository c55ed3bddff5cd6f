//! Application core — pure domain logic, zero I/O.
//!
//! This module holds the business rules for the rotation stage: event
//! pairing orchestration, angle management, and persistence replay.
//! All interaction with the outside world happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without a
//! real event bus, timer, or storage backend.

pub mod ports;
pub mod service;
