//! Small key-value settings storage.
//!
//! The equivalent of the host platform's user-defaults store: a handful
//! of scalar values (pending job ids, counters, client identity) behind
//! an injected capability, so components that need them stay testable.

use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Process-wide settings storage with get/set semantics.
pub trait KeyValueSettings: Send + Sync {
    /// Read the value stored under `key`.
    fn get_raw(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`, persisting synchronously.
    fn set_raw(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Remove `key`; removing an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Settings backed by a single JSON object file.
///
/// The whole object is rewritten (atomically) on every set; state is
/// mirrored in memory so reads never touch the disk.
pub struct JsonFileSettings {
    path: PathBuf,
    state: Mutex<Map<String, Value>>,
}

impl JsonFileSettings {
    /// Open the settings file at `path`, creating parent directories.
    ///
    /// A corrupt file is treated as empty settings.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let state = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt settings file treated as empty");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn persist(&self, state: &Map<String, Value>) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(state)?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        if let Err(e) = std::fs::write(&tmp, &bytes) {
            let _ = std::fs::remove_file(&tmp);
            return Err(StoreError::Io(e));
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(StoreError::Io(e));
        }
        Ok(())
    }
}

impl KeyValueSettings for JsonFileSettings {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.state
            .lock()
            .expect("settings state poisoned")
            .get(key)
            .cloned()
    }

    fn set_raw(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut state = self.state.lock().expect("settings state poisoned");
        state.insert(key.to_string(), value);
        self.persist(&state)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut state = self.state.lock().expect("settings state poisoned");
        if state.remove(key).is_some() {
            self.persist(&state)?;
        }
        Ok(())
    }
}

/// In-memory settings for tests.
#[derive(Default)]
pub struct MemorySettings {
    state: Mutex<Map<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueSettings for MemorySettings {
    fn get_raw(&self, key: &str) -> Option<Value> {
        self.state
            .lock()
            .expect("settings state poisoned")
            .get(key)
            .cloned()
    }

    fn set_raw(&self, key: &str, value: Value) -> StoreResult<()> {
        self.state
            .lock()
            .expect("settings state poisoned")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.state
            .lock()
            .expect("settings state poisoned")
            .remove(key);
        Ok(())
    }
}
