// Shared fixtures: a storage gateway that records writes and can be told to
// fail them, and a notification sink that keeps every message
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use uninote::storage::StorageResult;
use uninote::{
    AppData, Engine, EngineConfig, MemoryStorage, Note, NoticeLevel, NotificationSink, StorageError, StorageGateway,
};

#[derive(Default)]
pub struct RecordingStorage {
    inner: MemoryStorage,
    document_saves: AtomicUsize,
    app_data_saves: AtomicUsize,
    fail_writes: AtomicBool,
    write_delay: Mutex<Duration>,
    saved: Mutex<Vec<(String, Vec<Note>)>>,
}

impl RecordingStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn document_saves(&self) -> usize {
        self.document_saves.load(Ordering::SeqCst)
    }

    pub fn app_data_saves(&self) -> usize {
        self.app_data_saves.load(Ordering::SeqCst)
    }

    /// Every successful document write for `name`, oldest first
    pub fn saves_of(&self, name: &str) -> Vec<Vec<Note>> {
        self.saved
            .lock()
            .iter()
            .filter(|(doc, _)| doc == name)
            .map(|(_, notes)| notes.clone())
            .collect()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every document write take `delay`
    pub fn slow_writes(&self, delay: Duration) {
        *self.write_delay.lock() = delay;
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("disk full".into()));
        }
        Ok(())
    }

    /// Seed storage directly, bypassing the counters
    pub async fn seed(&self, app_data: &AppData, documents: &[(&str, Vec<Note>)]) {
        self.inner.save_app_data(app_data).await.unwrap();
        for (name, notes) in documents {
            self.inner.save_document(name, notes).await.unwrap();
        }
    }

    pub async fn stored(&self, name: &str) -> Option<Vec<Note>> {
        self.inner.load_document(name).await.unwrap()
    }

    pub async fn stored_app_data(&self) -> Option<AppData> {
        self.inner.load_app_data().await.unwrap()
    }
}

#[async_trait]
impl StorageGateway for RecordingStorage {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    async fn load_document(&self, name: &str) -> StorageResult<Option<Vec<Note>>> {
        self.inner.load_document(name).await
    }

    async fn save_document(&self, name: &str, notes: &[Note]) -> StorageResult<()> {
        self.check_writable()?;
        let delay = *self.write_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.document_saves.fetch_add(1, Ordering::SeqCst);
        self.saved.lock().push((name.to_string(), notes.to_vec()));
        self.inner.save_document(name, notes).await
    }

    async fn delete_document(&self, name: &str) -> StorageResult<()> {
        self.check_writable()?;
        self.inner.delete_document(name).await
    }

    async fn list_documents(&self) -> StorageResult<Vec<String>> {
        self.inner.list_documents().await
    }

    async fn load_app_data(&self) -> StorageResult<Option<AppData>> {
        self.inner.load_app_data().await
    }

    async fn save_app_data(&self, data: &AppData) -> StorageResult<()> {
        self.check_writable()?;
        self.app_data_saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_app_data(data).await
    }

    async fn load_setting(&self, key: &str) -> StorageResult<Option<serde_json::Value>> {
        self.inner.load_setting(key).await
    }

    async fn save_setting(&self, key: &str, value: &serde_json::Value) -> StorageResult<()> {
        self.check_writable()?;
        self.inner.save_setting(key, value).await
    }

    async fn delete_setting(&self, key: &str) -> StorageResult<()> {
        self.inner.delete_setting(key).await
    }
}

#[derive(Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn errors(&self) -> Vec<String> {
        self.at(NoticeLevel::Error)
    }

    pub fn at(&self, level: NoticeLevel) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.notices.lock().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().push((level, message.to_string()));
    }
}

pub fn config() -> EngineConfig {
    EngineConfig {
        default_document_name: "Main".to_string(),
        ..EngineConfig::ephemeral()
    }
}

pub async fn start(storage: &Arc<RecordingStorage>, sink: &Arc<RecordingSink>) -> Engine {
    Engine::start(config(), storage.clone(), sink.clone())
        .await
        .expect("engine starts")
}

/// Fresh engine on empty storage
pub async fn fresh() -> (Engine, Arc<RecordingStorage>, Arc<RecordingSink>) {
    let storage = RecordingStorage::new();
    let sink = RecordingSink::new();
    let engine = start(&storage, &sink).await;
    (engine, storage, sink)
}

pub fn note(id: &str, content: &str, children: Vec<Note>) -> Note {
    Note {
        id: id.to_string(),
        content: content.to_string(),
        children,
        ..Note::default()
    }
}

pub fn contents(notes: &[Note]) -> Vec<String> {
    notes.iter().map(|n| n.content.clone()).collect()
}

/// Engine over a single seeded document "Main"
pub async fn with_notes(notes: Vec<Note>) -> (Engine, Arc<RecordingStorage>, Arc<RecordingSink>) {
    let storage = RecordingStorage::new();
    storage.seed(&AppData::first_run("Main"), &[("Main", notes)]).await;
    let sink = RecordingSink::new();
    let engine = start(&storage, &sink).await;
    (engine, storage, sink)
}
