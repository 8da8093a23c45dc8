use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use warden_core::{Result, WardenError};

/// Process-wide string→string memory, persisted across runs.
///
/// Mutations are serialized and flushed immediately; readers of the same
/// store observe linearizable semantics per key. Malformed content on load
/// is treated as empty rather than an error.
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    path: PathBuf,
}

impl MemoryStore {
    /// Open the store at the default location
    /// (`<data_dir>/warden/memory.json`).
    pub fn open_default() -> Result<Self> {
        let dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("warden");
        Self::open(&dir.join("memory.json"))
    }

    /// Open the store at an explicit path, loading any existing content.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => {
                    info!(?path, keys = map.len(), "loaded memory store");
                    map
                }
                Err(e) => {
                    warn!(?path, error = %e, "memory file malformed, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(WardenError::Memory(e.to_string())),
        };

        Ok(Self {
            entries: Mutex::new(entries),
            path: path.to_path_buf(),
        })
    }

    /// Store a value under a key and flush.
    pub fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    /// Read a value back.
    pub fn read(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// All entries, ordered by key.
    pub fn list(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Delete a key and flush. Returns whether the key existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        let existed = entries.remove(key).is_some();
        if existed {
            self.flush(&entries)?;
        }
        Ok(existed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole map out, keeping a backup of the previous file.
    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WardenError::Memory(e.to_string()))?;
        }
        if self.path.exists() {
            let backup = self.path.with_extension("json.bak");
            if let Err(e) = std::fs::copy(&self.path, &backup) {
                warn!(error = %e, "failed to write memory backup");
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json).map_err(|e| WardenError::Memory(e.to_string()))?;
        Ok(())
    }
}
