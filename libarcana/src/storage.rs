//! Persisted profile store
//!
//! A single key/value slot holding the JSON-serialized [`UserProfile`].
//! Stores are pure read/write; the orchestrator decides when to write.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Result, StorageError};
use crate::profile::UserProfile;

/// Logical name of the profile slot
pub const PROFILE_KEY: &str = "currentUser";

pub trait ProfileStore: Send + Sync {
    /// Read the slot; `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<UserProfile>>;

    /// Overwrite the slot
    fn save(&self, profile: &UserProfile) -> Result<()>;
}

/// Profile slot backed by `<data_dir>/currentUser.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{}.json", PROFILE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for JsonFileStore {
    fn load(&self) -> Result<Option<UserProfile>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e).into()),
        };

        let profile = serde_json::from_str(&content).map_err(StorageError::Serde)?;
        Ok(Some(profile))
    }

    fn save(&self, profile: &UserProfile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }

        let json = serde_json::to_string_pretty(profile).map_err(StorageError::Serde)?;

        // Write to a sibling file first so a crash never truncates the slot
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(StorageError::Io)?;
        std::fs::rename(&tmp, &self.path).map_err(StorageError::Io)?;

        tracing::debug!("Saved profile to {}", self.path.display());
        Ok(())
    }
}

/// In-process profile slot
///
/// Clones share the same slot, so a test can hand one clone to the
/// service and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a profile (does not count as a write)
    pub fn with_profile(profile: &UserProfile) -> Result<Self> {
        let json = serde_json::to_string(profile).map_err(StorageError::Serde)?;
        let store = Self::new();
        *store.lock() = Some(json);
        Ok(store)
    }

    /// Raw JSON currently in the slot
    pub fn raw(&self) -> Option<String> {
        self.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProfileStore for MemoryStore {
    fn load(&self) -> Result<Option<UserProfile>> {
        match self.lock().as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json).map_err(StorageError::Serde)?)),
            None => Ok(None),
        }
    }

    fn save(&self, profile: &UserProfile) -> Result<()> {
        let json = serde_json::to_string(profile).map_err(StorageError::Serde)?;
        *self.lock() = Some(json);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArcanaError;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_missing_slot_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(&dir.path().join("nested"));

        let mut profile = UserProfile::with_id("user_file");
        profile.add_experience(150);
        store.save(&profile).unwrap();

        assert!(store.path().ends_with("currentUser.json"));
        assert!(!store.path().with_extension("json.tmp").exists());
        assert_eq!(store.load().unwrap(), Some(profile));
    }

    #[test]
    fn test_file_store_corrupt_slot_is_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, ArcanaError::Storage(StorageError::Serde(_))));
    }

    #[test]
    fn test_memory_store_shared_between_clones() {
        let store = MemoryStore::new();
        let observer = store.clone();

        store.save(&UserProfile::with_id("user_mem")).unwrap();

        assert_eq!(observer.write_count(), 1);
        assert_eq!(observer.load().unwrap().unwrap().id, "user_mem");
        assert!(observer.raw().unwrap().contains("\"readingHistory\""));
    }

    #[test]
    fn test_memory_store_seed_is_not_a_write() {
        let store = MemoryStore::with_profile(&UserProfile::with_id("seeded")).unwrap();
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.load().unwrap().unwrap().id, "seeded");
    }
}
