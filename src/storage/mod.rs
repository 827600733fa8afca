// Storage layer for the Uninote engine
// The engine only sees the StorageGateway trait; backends are picked at startup

mod file;
mod memory;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::StorageError;
use crate::models::{AppData, EngineConfig, EngineConfigOverride, Note, StorageKind};

pub use file::FileStorage;
pub use memory::MemoryStorage;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Setting keys persisted next to documents
pub mod keys {
    pub const THEME: &str = "Theme";
    pub const RECENT_ICONS: &str = "Recents";
    pub const SEEN_NOTIFICATIONS: &str = "SeenNotifications";
    pub const LAST_MORNING_REPORT: &str = "LastMorningReport";
    pub const LAST_NOON_REPORT: &str = "LastNoonReport";
    pub const LAST_EVENING_REPORT: &str = "LastEveningReport";
    pub const BUTTON_CONFIGURATION: &str = "buttonConfiguration";
}

/// Durable persistence used by the engine. Every call may fail.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn load_document(&self, name: &str) -> StorageResult<Option<Vec<Note>>>;
    async fn save_document(&self, name: &str, notes: &[Note]) -> StorageResult<()>;
    async fn delete_document(&self, name: &str) -> StorageResult<()>;
    async fn list_documents(&self) -> StorageResult<Vec<String>>;

    async fn load_app_data(&self) -> StorageResult<Option<AppData>>;
    async fn save_app_data(&self, data: &AppData) -> StorageResult<()>;

    async fn load_setting(&self, key: &str) -> StorageResult<Option<serde_json::Value>>;
    async fn save_setting(&self, key: &str, value: &serde_json::Value) -> StorageResult<()>;
    async fn delete_setting(&self, key: &str) -> StorageResult<()>;
}

pub type StorageState = Arc<dyn StorageGateway>;

/// Load a setting and decode it; undecodable values count as missing
pub async fn load_setting_as<T: DeserializeOwned>(
    storage: &dyn StorageGateway,
    key: &str,
) -> StorageResult<Option<T>> {
    let Some(value) = storage.load_setting(key).await? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            warn!("[load_setting_as] Ignoring malformed setting '{}': {}", key, e);
            Ok(None)
        }
    }
}

pub async fn save_setting_as<T: Serialize + ?Sized>(
    storage: &dyn StorageGateway,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let value = serde_json::to_value(value)?;
    storage.save_setting(key, &value).await
}

/// Pick the configured backend, falling back to memory when the
/// file backend cannot be opened
pub async fn open_storage(config: &EngineConfig) -> StorageState {
    if config.storage == StorageKind::Memory {
        info!("[open_storage] Using in-memory storage");
        return Arc::new(MemoryStorage::new());
    }

    let Some(root) = config.resolved_data_dir() else {
        warn!("[open_storage] No data directory available, falling back to memory");
        return Arc::new(MemoryStorage::new());
    };

    match FileStorage::open(&root).await {
        Ok(storage) => {
            info!("[open_storage] Using file storage at {:?}", root);
            Arc::new(storage)
        }
        Err(e) => {
            warn!("[open_storage] File storage at {:?} unavailable ({}), falling back to memory", root, e);
            Arc::new(MemoryStorage::new())
        }
    }
}

// ============================================
// CONFIG FILE
// ============================================

/// Global config file path (~/.uninote/config.md)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".uninote").join("config.md"))
}

/// Parse YAML frontmatter from markdown content
pub fn parse_frontmatter<T: DeserializeOwned>(content: &str) -> Option<(T, String)> {
    let content = content.trim();
    let rest = content.strip_prefix("---")?;
    let end = rest.find("\n---")?;
    let yaml = rest[..end].trim();
    let body = rest[end + 4..].trim().to_string();

    let frontmatter: T = serde_yaml::from_str(yaml).ok()?;
    Some((frontmatter, body))
}

/// Serialize frontmatter + body to markdown
pub fn to_markdown<T: Serialize>(frontmatter: &T, body: &str) -> Result<String, String> {
    let yaml = serde_yaml::to_string(frontmatter).map_err(|e| format!("YAML error: {}", e))?;
    Ok(format!("---\n{}---\n\n{}", yaml, body))
}

/// Load config.md; missing or broken files give defaults
pub fn load_config(path: &Path) -> EngineConfig {
    let Ok(content) = fs::read_to_string(path) else {
        info!("[load_config] No config at {:?}, using defaults", path);
        return EngineConfig::default();
    };
    match parse_frontmatter::<EngineConfigOverride>(&content) {
        Some((over, _)) => EngineConfig::default().with_override(&over),
        None => {
            warn!("[load_config] Failed to parse frontmatter in {:?}, using defaults", path);
            EngineConfig::default()
        }
    }
}

pub fn save_config(path: &Path, config: &EngineConfig) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let content = to_markdown(config, "# Uninote\n\nEngine settings live in the frontmatter above.\n")?;
    fs::write(path, content).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frontmatter() {
        let raw = "---\ndebounceMs: 750\nlogLevel: debug\n---\n\nbody text";
        let (over, body) = parse_frontmatter::<EngineConfigOverride>(raw).unwrap();
        assert_eq!(over.debounce_ms, Some(750));
        assert_eq!(over.log_level.as_deref(), Some("debug"));
        assert_eq!(body, "body text");
    }

    #[test]
    fn test_missing_frontmatter() {
        assert!(parse_frontmatter::<EngineConfigOverride>("no header").is_none());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.md");
        let config = EngineConfig {
            debounce_ms: 900,
            ..EngineConfig::default()
        };
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path), config);
    }

    #[test]
    fn test_missing_config_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(&dir.path().join("absent.md")), EngineConfig::default());
    }

    #[tokio::test]
    async fn test_open_storage_memory() {
        let storage = open_storage(&EngineConfig::ephemeral()).await;
        assert_eq!(storage.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_open_storage_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let config = EngineConfig {
            data_dir: Some(blocker.join("sub")),
            ..EngineConfig::default()
        };
        let storage = open_storage(&config).await;
        assert_eq!(storage.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_typed_settings() {
        let storage = MemoryStorage::new();
        save_setting_as(&storage, keys::RECENT_ICONS, &vec!["🔥", "✅"]).await.unwrap();
        let icons: Option<Vec<String>> = load_setting_as(&storage, keys::RECENT_ICONS).await.unwrap();
        assert_eq!(icons, Some(vec!["🔥".to_string(), "✅".to_string()]));

        storage.save_setting(keys::THEME, &serde_json::json!(42)).await.unwrap();
        let theme: Option<String> = load_setting_as(&storage, keys::THEME).await.unwrap();
        assert!(theme.is_none());
    }
}
