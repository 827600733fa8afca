// In-memory backend, also the fallback when the file backend is unusable

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{StorageGateway, StorageResult};
use crate::models::{AppData, Note};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, Vec<Note>>>,
    app_data: RwLock<Option<AppData>>,
    settings: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn load_document(&self, name: &str) -> StorageResult<Option<Vec<Note>>> {
        Ok(self.documents.read().get(name).cloned())
    }

    async fn save_document(&self, name: &str, notes: &[Note]) -> StorageResult<()> {
        self.documents.write().insert(name.to_string(), notes.to_vec());
        Ok(())
    }

    async fn delete_document(&self, name: &str) -> StorageResult<()> {
        self.documents.write().remove(name);
        Ok(())
    }

    async fn list_documents(&self) -> StorageResult<Vec<String>> {
        let mut names: Vec<String> = self.documents.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn load_app_data(&self) -> StorageResult<Option<AppData>> {
        Ok(self.app_data.read().clone())
    }

    async fn save_app_data(&self, data: &AppData) -> StorageResult<()> {
        *self.app_data.write() = Some(data.clone());
        Ok(())
    }

    async fn load_setting(&self, key: &str) -> StorageResult<Option<serde_json::Value>> {
        Ok(self.settings.read().get(key).cloned())
    }

    async fn save_setting(&self, key: &str, value: &serde_json::Value) -> StorageResult<()> {
        self.settings.write().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete_setting(&self, key: &str) -> StorageResult<()> {
        self.settings.write().remove(key);
        Ok(())
    }
}
