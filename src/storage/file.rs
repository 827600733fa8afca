// File backend: one JSON file per document and per setting under a root directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use super::{StorageGateway, StorageResult};
use crate::models::common::now_iso;
use crate::error::StorageError;
use crate::models::{AppData, Note};

const DOCUMENTS_DIR: &str = "documents";
const SETTINGS_DIR: &str = "settings";
const APP_DATA_FILE: &str = "app-data.json";
const PROBE_FILE: &str = ".write-probe";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocument {
    name: String,
    notes: Vec<Note>,
    #[serde(default)]
    last_modified: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSetting {
    key: String,
    value: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

// ============================================
// PATH HELPERS
// ============================================

fn encoded_file_name(name: &str) -> String {
    format!("{}.json", urlencoding::encode(name))
}

fn decoded_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".json")?;
    urlencoding::decode(stem).ok().map(|s| s.into_owned())
}

impl FileStorage {
    /// Create the directory layout and make sure it is writable
    pub async fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(DOCUMENTS_DIR)).await?;
        fs::create_dir_all(root.join(SETTINGS_DIR)).await?;

        let probe = root.join(PROBE_FILE);
        fs::write(&probe, b"ok").await?;
        fs::remove_file(&probe).await?;

        debug!("[FileStorage::open] Opened {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.root.join(DOCUMENTS_DIR).join(encoded_file_name(name))
    }

    fn setting_path(&self, key: &str) -> PathBuf {
        self.root.join(SETTINGS_DIR).join(encoded_file_name(key))
    }

    fn app_data_path(&self) -> PathBuf {
        self.root.join(APP_DATA_FILE)
    }

    /// Write through a temp file and rename so readers never see half a file
    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> StorageResult<Option<T>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn remove_if_exists(&self, path: &Path) -> StorageResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[async_trait]
impl StorageGateway for FileStorage {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn load_document(&self, name: &str) -> StorageResult<Option<Vec<Note>>> {
        let stored: Option<StoredDocument> = self.read_json(&self.document_path(name)).await?;
        Ok(stored.map(|doc| doc.notes))
    }

    async fn save_document(&self, name: &str, notes: &[Note]) -> StorageResult<()> {
        let record = StoredDocument {
            name: name.to_string(),
            notes: notes.to_vec(),
            last_modified: now_iso(),
        };
        self.write_json(&self.document_path(name), &record).await?;
        debug!("[FileStorage::save_document] Saved '{}' ({} top-level notes)", name, notes.len());
        Ok(())
    }

    async fn delete_document(&self, name: &str) -> StorageResult<()> {
        self.remove_if_exists(&self.document_path(name)).await
    }

    async fn list_documents(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(self.root.join(DOCUMENTS_DIR)).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str().and_then(decoded_name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn load_app_data(&self) -> StorageResult<Option<AppData>> {
        self.read_json(&self.app_data_path()).await
    }

    async fn save_app_data(&self, data: &AppData) -> StorageResult<()> {
        self.write_json(&self.app_data_path(), data).await
    }

    async fn load_setting(&self, key: &str) -> StorageResult<Option<serde_json::Value>> {
        let stored: Option<StoredSetting> = self.read_json(&self.setting_path(key)).await?;
        Ok(stored.map(|s| s.value))
    }

    async fn save_setting(&self, key: &str, value: &serde_json::Value) -> StorageResult<()> {
        let record = StoredSetting {
            key: key.to_string(),
            value: value.clone(),
        };
        self.write_json(&self.setting_path(key), &record).await
    }

    async fn delete_setting(&self, key: &str) -> StorageResult<()> {
        self.remove_if_exists(&self.setting_path(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names_are_reversible() {
        let name = "Work / Ideas: 2024?";
        let file = encoded_file_name(name);
        assert!(!file.contains('/'));
        assert_eq!(decoded_name(&file).as_deref(), Some(name));
        assert!(decoded_name("readme.txt").is_none());
    }

    #[tokio::test]
    async fn test_document_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).await.unwrap();

        let mut parent = Note::new("parent");
        parent.children.push(Note::new("child"));
        storage.save_document("Mi Primer Uninote", &[parent.clone()]).await.unwrap();

        let loaded = storage.load_document("Mi Primer Uninote").await.unwrap().unwrap();
        assert_eq!(loaded, vec![parent]);
        assert_eq!(storage.list_documents().await.unwrap(), vec!["Mi Primer Uninote".to_string()]);

        // reopening sees the same data
        let reopened = FileStorage::open(dir.path()).await.unwrap();
        assert!(reopened.load_document("Mi Primer Uninote").await.unwrap().is_some());

        storage.delete_document("Mi Primer Uninote").await.unwrap();
        storage.delete_document("Mi Primer Uninote").await.unwrap();
        assert!(storage.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_app_data_and_settings() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).await.unwrap();
        assert!(storage.load_app_data().await.unwrap().is_none());

        let data = AppData::first_run("Inbox");
        storage.save_app_data(&data).await.unwrap();
        assert_eq!(storage.load_app_data().await.unwrap(), Some(data));

        storage.save_setting("Theme", &serde_json::json!("dark")).await.unwrap();
        assert_eq!(storage.load_setting("Theme").await.unwrap(), Some(serde_json::json!("dark")));
        storage.delete_setting("Theme").await.unwrap();
        assert!(storage.load_setting("Theme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).await.unwrap();
        std::fs::write(storage.document_path("Broken"), "{not json").unwrap();
        assert!(matches!(
            storage.load_document("Broken").await,
            Err(StorageError::Serialization(_))
        ));
    }
}
