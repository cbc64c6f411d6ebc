//! # Preference Store
//!
//! Remembers which camera worked last time, across restarts.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Preference Storage                                 │
//! │                                                                         │
//! │  DevicePreference          get() / set(id) / clear()                   │
//! │        │                   bound to one key                            │
//! │        ▼                                                                │
//! │  dyn KeyValueStore         get(key) / set(key, value) / remove(key)    │
//! │        │                                                                │
//! │        ├── TomlFileStore   <data dir>/preferences.toml                 │
//! │        └── MemoryStore     tests, ephemeral kiosks                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No validation happens here. Whether a stored id is still usable is the
//! camera selector's call.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};

// =============================================================================
// Key-Value Store
// =============================================================================

/// Durable string storage keyed by name.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> SessionResult<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> SessionResult<()>;

    /// Removes a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> SessionResult<()>;
}

/// In-memory store. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SessionResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SessionResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

/// Store backed by a flat TOML file of string values.
///
/// ```toml
/// preferredBackCameraId = "8f1c...e2"
/// ```
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    io: Mutex<()>,
}

impl TomlFileStore {
    /// Creates a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TomlFileStore {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    /// Creates a store in the platform data directory.
    ///
    /// ## Platform-Specific Paths
    /// - **Linux**: `~/.local/share/stampscan/preferences.toml`
    /// - **macOS**: `~/Library/Application Support/org.stamprally.stampscan/preferences.toml`
    /// - **Windows**: `%APPDATA%\stamprally\stampscan\data\preferences.toml`
    pub fn in_data_dir() -> SessionResult<Self> {
        let dirs = directories::ProjectDirs::from("org", "stamprally", "stampscan")
            .ok_or(SessionError::NoDataDir)?;
        Ok(Self::new(dirs.data_dir().join("preferences.toml")))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> SessionResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| SessionError::StoreRead(e.to_string()))?;
        toml::from_str(&contents).map_err(|e| SessionError::StoreCorrupt(e.to_string()))
    }

    /// Reads the file for a write. A corrupt file is replaced rather than
    /// blocking every later write; the flag reports that it must be rewritten.
    fn read_for_write(&self) -> SessionResult<(BTreeMap<String, String>, bool)> {
        match self.read_all() {
            Ok(values) => Ok((values, false)),
            Err(SessionError::StoreCorrupt(reason)) => {
                warn!(path = ?self.path, %reason, "Preference file is corrupt, rewriting it");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::StoreWrite(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(values)?;
        std::fs::write(&self.path, contents).map_err(|e| SessionError::StoreWrite(e.to_string()))?;

        debug!(path = ?self.path, "Preferences written");
        Ok(())
    }
}

impl KeyValueStore for TomlFileStore {
    fn get(&self, key: &str) -> SessionResult<Option<String>> {
        let _io = self.io.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> SessionResult<()> {
        let _io = self.io.lock().unwrap_or_else(|e| e.into_inner());
        let (mut values, _) = self.read_for_write()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> SessionResult<()> {
        let _io = self.io.lock().unwrap_or_else(|e| e.into_inner());
        let (mut values, corrupt) = self.read_for_write()?;
        if values.remove(key).is_some() || corrupt {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

// =============================================================================
// Device Preference
// =============================================================================

/// The persisted id of the last camera the platform actually bound.
#[derive(Clone)]
pub struct DevicePreference {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl DevicePreference {
    /// Binds `store` to `key`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        DevicePreference {
            store,
            key: key.into(),
        }
    }

    /// An in-memory preference under the default key.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), stampscan_core::PREFERRED_CAMERA_KEY)
    }

    /// Returns the stored device id.
    pub fn get(&self) -> SessionResult<Option<String>> {
        self.store.get(&self.key)
    }

    /// Stores a negotiated device id.
    pub fn set(&self, device_id: &str) -> SessionResult<()> {
        self.store.set(&self.key, device_id)?;
        info!(device_id = %device_id, "Preferred camera saved");
        Ok(())
    }

    /// Forgets the stored device id.
    pub fn clear(&self) -> SessionResult<()> {
        self.store.remove(&self.key)
    }
}

impl std::fmt::Debug for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevicePreference").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_preference_lifecycle() {
        let pref = DevicePreference::in_memory();
        assert_eq!(pref.get().unwrap(), None);

        pref.set("cam-42").unwrap();
        assert_eq!(pref.get().unwrap().as_deref(), Some("cam-42"));

        pref.clear().unwrap();
        assert_eq!(pref.get().unwrap(), None);

        // Clearing twice is fine
        pref.clear().unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.toml");

        let store = TomlFileStore::new(&path);
        store.set("preferredBackCameraId", "cam-7").unwrap();
        store.set("other", "kept").unwrap();
        drop(store);

        let reopened = TomlFileStore::new(&path);
        assert_eq!(
            reopened.get("preferredBackCameraId").unwrap().as_deref(),
            Some("cam-7")
        );

        reopened.remove("preferredBackCameraId").unwrap();
        assert_eq!(reopened.get("preferredBackCameraId").unwrap(), None);
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlFileStore::new(dir.path().join("absent.toml"));
        assert_eq!(store.get("anything").unwrap(), None);
        store.remove("anything").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let store = TomlFileStore::new(&path);
        let err = store.get("preferredBackCameraId").unwrap_err();
        assert!(matches!(err, SessionError::StoreCorrupt(_)));
        assert!(err.is_storage_error());
    }

    #[test]
    fn test_write_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let pref = DevicePreference::new(
            Arc::new(TomlFileStore::new(&path)),
            stampscan_core::PREFERRED_CAMERA_KEY,
        );
        pref.set("cam-9").unwrap();
        assert_eq!(pref.get().unwrap().as_deref(), Some("cam-9"));

        std::fs::write(&path, "still = = broken").unwrap();
        pref.clear().unwrap();
        assert_eq!(pref.get().unwrap(), None);
    }

    #[test]
    fn test_preference_uses_its_key() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let pref = DevicePreference::new(store.clone(), "customKey");
        pref.set("cam-1").unwrap();
        assert_eq!(store.get("customKey").unwrap().as_deref(), Some("cam-1"));
        assert_eq!(store.get("preferredBackCameraId").unwrap(), None);
    }
}
