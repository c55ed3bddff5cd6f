//! Settings storage adapter.
//!
//! Implements [`StoragePort`] over an in-memory map of composite
//! `namespace::key` entries, optionally mirrored to a JSON file so
//! persisted angles survive a restart.  Saves are atomic per key; the
//! file mirror is written in one piece on [`flush_to_file`].
//!
//! [`flush_to_file`]: SettingsStore::flush_to_file

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use log::{info, warn};

use crate::app::ports::{StorageError, StoragePort};

/// Key-value settings store with an optional JSON file mirror.
pub struct SettingsStore {
    // BTreeMap keeps for_each iteration (and the file mirror) stable.
    entries: BTreeMap<String, Vec<u8>>,
}

impl SettingsStore {
    /// Create an empty, memory-only store.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Load the store from a JSON file mirror.
    ///
    /// A missing file yields an empty store (first boot); a present but
    /// unparseable file is an error so corruption is never papered over.
    pub fn load_from_file(path: &Path) -> io::Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("settings file {} not found, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e),
        };
        let entries: BTreeMap<String, Vec<u8>> = serde_json::from_str(&text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        info!(
            "loaded {} settings entr{} from {}",
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" },
            path.display()
        );
        Ok(Self { entries })
    }

    /// Write the whole store to the JSON file mirror.
    pub fn flush_to_file(&self, path: &Path) -> io::Result<()> {
        let text = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)?;
        info!("flushed settings to {}", path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{namespace}::{key}")
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoragePort for SettingsStore {
    fn save(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if namespace.is_empty() || key.is_empty() {
            warn!("settings save with empty namespace or key rejected");
            return Err(StorageError::IoError);
        }
        self.entries
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    fn for_each(&self, namespace: &str, visit: &mut dyn FnMut(&str, &[u8])) {
        let prefix = format!("{namespace}::");
        for (composite, value) in &self.entries {
            if let Some(key) = composite.strip_prefix(&prefix) {
                visit(key, value);
            }
        }
    }
}
