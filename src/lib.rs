//! Rotostage library.
//!
//! A coordinate-rotation stage for pointing-device input pipelines: it
//! buffers the X and Y components of a motion sample, rotates the pair
//! by a configurable per-instance angle, and re-emits rotated events.
//! Exposes the pure-logic modules for integration testing and embedding.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod event;
pub mod registry;
pub mod rotor;
pub mod shell;
pub mod timeout;

pub mod error;

pub mod adapters;
