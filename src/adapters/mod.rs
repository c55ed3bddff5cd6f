//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements  | Connects to                  |
//! |------------|-------------|------------------------------|
//! | `log_sink` | EventSink   | Structured log output        |
//! | `settings` | StoragePort | JSON-file-backed angle store |
//! | `time`     | —           | Monotonic host clock         |

pub mod log_sink;
pub mod settings;
pub mod time;
