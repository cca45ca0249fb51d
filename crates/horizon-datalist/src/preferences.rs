//! Persisted list preferences.
//!
//! A widget keeps one small record of column/list settings in a single named
//! slot. The slot is read once at startup and may hold anything: a missing
//! slot, unreadable storage or undecodable content all mean "no
//! preferences", never a failed startup (see [`load_or_none`]).
//!
//! Two stores are provided:
//!
//! - [`MemoryPreferenceStore`]: a raw text slot, decoded on every load. This
//!   is the shape of browser local storage and the default collaborator.
//! - [`FilePreferenceStore`]: a JSON file, written atomically.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use horizon_datalist_core::logging::targets;

use crate::error::{DataListError, Result};

/// Name of the slot list preferences are persisted under.
pub const LIST_SETTINGS_KEY: &str = "dl__list_settings";

/// A structurally typed record of column/list preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(Map<String, Value>);

impl Preferences {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a preference value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a preference value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Whether the record holds no preferences.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode from JSON text. Only JSON objects are preferences.
    pub fn from_json(key: &str, json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| DataListError::preferences_decode(key, err))
    }

    /// Encode to JSON text.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(DataListError::PreferencesEncode)
    }
}

impl From<Map<String, Value>> for Preferences {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Load/save contract of the persisted preferences slot.
pub trait PreferenceStore: Send + Sync {
    /// Read the slot. `Ok(None)` means the slot is empty.
    fn load(&self) -> Result<Option<Preferences>>;

    /// Replace the slot.
    fn save(&self, preferences: &Preferences) -> Result<()>;
}

/// Read the slot, treating every failure as "no preferences".
pub fn load_or_none(store: &dyn PreferenceStore) -> Option<Preferences> {
    match store.load() {
        Ok(preferences) => preferences,
        Err(err) => {
            tracing::warn!(target: targets::PREFERENCES, error = %err, "ignoring unreadable preferences");
            None
        }
    }
}

/// A single raw text slot held in memory.
#[derive(Debug)]
pub struct MemoryPreferenceStore {
    key: String,
    raw: RwLock<Option<String>>,
}

impl Default for MemoryPreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPreferenceStore {
    /// Create an empty slot under [`LIST_SETTINGS_KEY`].
    pub fn new() -> Self {
        Self::with_key(LIST_SETTINGS_KEY)
    }

    /// Create an empty slot under a custom key.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            raw: RwLock::new(None),
        }
    }

    /// Create a slot pre-filled with raw text, which need not be valid JSON.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        let store = Self::new();
        *store.raw.write() = Some(raw.into());
        store
    }

    /// The slot name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The raw slot contents.
    pub fn raw(&self) -> Option<String> {
        self.raw.read().clone()
    }

    /// Empty the slot.
    pub fn clear(&self) {
        *self.raw.write() = None;
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<Preferences>> {
        match self.raw.read().as_deref() {
            None => Ok(None),
            // A slot holding JSON `null` is as good as empty.
            Some(raw) if raw.trim() == "null" => Ok(None),
            Some(raw) => Preferences::from_json(&self.key, raw).map(Some),
        }
    }

    fn save(&self, preferences: &Preferences) -> Result<()> {
        *self.raw.write() = Some(preferences.to_json()?);
        Ok(())
    }
}

/// Preferences persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    /// Use the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `<config dir>/<LIST_SETTINGS_KEY>.json` in the per-user config
    /// directory of `application`.
    pub fn in_config_dir(application: &str) -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", application)
            .ok_or_else(|| DataListError::NoConfigDir(application.to_string()))?;
        Ok(Self::new(
            dirs.config_dir().join(format!("{LIST_SETTINGS_KEY}.json")),
        ))
    }

    /// The file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<Preferences>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(DataListError::preferences_io(&self.path, err)),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        Preferences::from_json(&self.path.to_string_lossy(), &content).map(Some)
    }

    fn save(&self, preferences: &Preferences) -> Result<()> {
        let json = preferences.to_json()?;
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).map_err(|err| DataListError::preferences_io(parent, err))?;

        // Temp file in the same directory so the rename stays on one filesystem.
        let mut temp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|err| DataListError::preferences_io(parent, err))?;
        std::io::Write::write_all(&mut temp, json.as_bytes())
            .map_err(|err| DataListError::preferences_io(temp.path(), err))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| DataListError::preferences_io(temp.path(), err))?;
        temp.persist(&self.path)
            .map_err(|err| DataListError::preferences_io(&self.path, err.error))?;

        tracing::debug!(target: targets::PREFERENCES, path = %self.path.display(), "saved preferences");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_empty() {
        let store = MemoryPreferenceStore::new();
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.key(), LIST_SETTINGS_KEY);
    }

    #[test]
    fn test_memory_store_save_load() {
        let store = MemoryPreferenceStore::new();
        let prefs = Preferences::new().with("columns", json!(["name", "price"]));
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), Some(prefs));
    }

    #[test]
    fn test_memory_store_clear_empties_slot() {
        let store = MemoryPreferenceStore::new();
        store.save(&Preferences::new().with("dense", true)).unwrap();
        assert_eq!(store.raw().as_deref(), Some(r#"{"dense":true}"#));

        store.clear();
        assert_eq!(store.raw(), None);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_memory_store_null_is_empty() {
        let store = MemoryPreferenceStore::with_raw("null");
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_decode_failure_is_error_but_load_or_none_swallows_it() {
        let store = MemoryPreferenceStore::with_raw("{not json");
        assert!(matches!(
            store.load(),
            Err(DataListError::PreferencesDecode { .. })
        ));
        assert_eq!(load_or_none(&store), None);

        let store = MemoryPreferenceStore::with_raw("[1, 2, 3]");
        assert_eq!(load_or_none(&store), None);
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path().join("prefs.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::new(dir.path().join("nested").join("prefs.json"));

        let prefs = Preferences::new().with("pageSize", 50);
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), Some(prefs.clone()));

        let replaced = prefs.with("pageSize", 25);
        store.save(&replaced).unwrap();
        assert_eq!(store.load().unwrap(), Some(replaced));
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "garbage").unwrap();

        let store = FilePreferenceStore::new(&path);
        assert!(store.load().is_err());
        assert_eq!(load_or_none(&store), None);
    }

    #[test]
    fn test_config_dir_store_uses_list_settings_file() {
        match FilePreferenceStore::in_config_dir("horizon-datalist-tests") {
            Ok(store) => {
                assert_eq!(
                    store.path().file_name().and_then(|name| name.to_str()),
                    Some("dl__list_settings.json")
                );
                assert!(store.path().is_absolute());
            }
            // Sandboxes without a home directory have no config dir.
            Err(err) => assert!(matches!(err, DataListError::NoConfigDir(app) if app == "horizon-datalist-tests")),
        }
    }
}
