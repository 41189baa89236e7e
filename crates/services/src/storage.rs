//! Key-value persistence for settings and chat history.

use parking_lot::Mutex;
use shared::history::ChatHistory;
use shared::settings::AppSettings;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub const SETTINGS_KEY: &str = "app-settings";
pub const HISTORY_KEY: &str = "chat-history";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot encode stored value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No config directory available on this platform")]
    NoConfigDir,
}

/// String values stored under string keys
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted in the platform config directory
    pub fn in_config_dir() -> Result<Self, StorageError> {
        directories::ProjectDirs::from("com.local", "Artifact Studio", "ArtifactStudio")
            .map(|p| Self::new(p.config_dir()))
            .ok_or(StorageError::NoConfigDir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        debug!(key, "stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Process-local store, for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Read a JSON value; missing, unreadable or corrupt data yields `None`.
fn load_json<T: serde::de::DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Cannot read {}: {}", key, e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring corrupt {} data: {}", key, e);
            None
        }
    }
}

pub struct SettingsRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored settings merged over the defaults
    pub fn load(&self) -> AppSettings {
        load_json::<AppSettings>(self.store.as_ref(), SETTINGS_KEY)
            .unwrap_or_default()
            .normalized()
    }

    pub fn save(&self, settings: &AppSettings) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(settings)?;
        self.store.set(SETTINGS_KEY, &json)
    }

    /// Load, modify and persist in one step
    pub fn update(&self, f: impl FnOnce(&mut AppSettings)) -> Result<AppSettings, StorageError> {
        let mut settings = self.load();
        f(&mut settings);
        let settings = settings.normalized();
        self.save(&settings)?;
        Ok(settings)
    }

    pub fn reset(&self) -> Result<AppSettings, StorageError> {
        self.store.remove(SETTINGS_KEY)?;
        Ok(AppSettings::default())
    }
}

pub struct ChatHistoryRepository {
    store: Arc<dyn KeyValueStore>,
}

impl ChatHistoryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> ChatHistory {
        load_json(self.store.as_ref(), HISTORY_KEY).unwrap_or_default()
    }

    pub fn save(&self, history: &ChatHistory) -> Result<(), StorageError> {
        let json = serde_json::to_string(history)?;
        self.store.set(HISTORY_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::settings::Theme;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("nested"));

        assert_eq!(store.get("missing").unwrap(), None);
        store.set("greeting", "hello").unwrap();
        assert_eq!(store.get("greeting").unwrap().as_deref(), Some("hello"));
        assert!(tmp.path().join("nested/greeting.json").exists());

        store.remove("greeting").unwrap();
        store.remove("greeting").unwrap();
        assert_eq!(store.get("greeting").unwrap(), None);
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        store.set("../escape", "x").unwrap();
        assert!(tmp.path().join("___escape.json").exists());
    }

    #[test]
    fn test_settings_default_when_absent() {
        let repo = SettingsRepository::new(Arc::new(MemoryStore::new()));
        assert_eq!(repo.load(), AppSettings::default());
    }

    #[test]
    fn test_corrupt_settings_fall_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(SETTINGS_KEY, "{not json").unwrap();
        let repo = SettingsRepository::new(store);
        assert_eq!(repo.load(), AppSettings::default());
    }

    #[test]
    fn test_settings_update_persists() {
        let tmp = TempDir::new().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(tmp.path()));
        let repo = SettingsRepository::new(store.clone());

        let updated = repo
            .update(|s| {
                s.theme = Theme::Dark;
                s.chat_background_transparency = 180;
            })
            .unwrap();
        assert_eq!(updated.chat_background_transparency, 100);

        let reloaded = SettingsRepository::new(store).load();
        assert_eq!(reloaded.theme, Theme::Dark);

        assert_eq!(repo.reset().unwrap(), AppSettings::default());
        assert_eq!(repo.load().theme, AppSettings::default().theme);
    }

    #[test]
    fn test_history_round_trip_and_corruption() {
        let store = Arc::new(MemoryStore::new());
        let repo = ChatHistoryRepository::new(store.clone());
        assert!(repo.load().is_empty());

        let mut history = ChatHistory::new();
        history.add("Snake game", 2, Some("Here is your game"));
        repo.save(&history).unwrap();
        assert_eq!(repo.load(), history);

        store.set(HISTORY_KEY, "[{\"broken\":").unwrap();
        assert!(repo.load().is_empty());
    }
}
