// Engine module: the operations a UI layer calls
// Each submodule adds one group of operations to Engine

pub mod archive;
pub mod bulk;
pub mod common;
pub mod documents;
pub mod notes;
pub mod preferences;
pub mod reminders;
pub mod search;
pub mod security;
pub mod transfer;
pub mod tree;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Result, UninoteError};
use crate::models::{AppData, Document, EngineConfig};
use crate::notify::{NoticeLevel, NotificationSink};
use crate::scheduler::{DocumentRef, SaveScheduler};
use crate::session::{AppSession, SecuritySession};
use crate::storage::StorageState;

pub use tree::MoveOutcome;

pub struct Engine {
    config: EngineConfig,
    storage: StorageState,
    notifier: Arc<dyn NotificationSink>,
    scheduler: SaveScheduler,
    session: Arc<AppSession>,
}

impl Engine {
    /// Build an engine without loading anything; saves stay suppressed
    /// until `bootstrap` has opened the first document.
    pub fn new(config: EngineConfig, storage: StorageState, notifier: Arc<dyn NotificationSink>) -> Self {
        let scheduler = SaveScheduler::new(
            storage.clone(),
            notifier.clone(),
            Duration::from_millis(config.debounce_ms),
        );
        Self {
            config,
            storage,
            notifier,
            scheduler,
            session: Arc::new(AppSession::default()),
        }
    }

    pub async fn start(
        config: EngineConfig,
        storage: StorageState,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let engine = Self::new(config, storage, notifier);
        engine.bootstrap().await?;
        Ok(engine)
    }

    /// Load app data (creating it on first run), preferences and the
    /// active document, then enable saving.
    pub async fn bootstrap(&self) -> Result<()> {
        info!("[bootstrap] Starting with {} storage", self.storage.backend_name());

        let app_data = match self.storage.load_app_data().await? {
            Some(mut data) => {
                if data.documents.is_empty() {
                    warn!("[bootstrap] App data lists no documents, adding the default one");
                    data.add_document(&self.config.default_document_name);
                    self.storage.save_app_data(&data).await?;
                }
                data
            }
            None => {
                info!("[bootstrap] First run, creating '{}'", self.config.default_document_name);
                let data = AppData::first_run(&self.config.default_document_name);
                self.storage
                    .save_document(&self.config.default_document_name, &[])
                    .await?;
                self.storage.save_app_data(&data).await?;
                data
            }
        };

        let target = app_data
            .active_document
            .clone()
            .filter(|name| app_data.has_document(name))
            .or_else(|| app_data.documents.first().cloned())
            .unwrap_or_else(|| self.config.default_document_name.clone());
        if app_data.is_app_lock_enabled && app_data.app_lock_password_hash.is_some() {
            self.session.security.set_app_locked(true);
        }
        *self.session.app_data.write() = app_data;

        self.load_preferences().await;
        let doc = self.open_document(&target).await?;
        self.scheduler.finish_initialization();

        let guard = doc.read();
        info!(
            "[bootstrap] Ready, '{}' open ({} notes{})",
            guard.name(),
            guard.total_count(),
            if guard.is_sealed() { ", locked" } else { "" }
        );
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &AppSession {
        &self.session
    }

    pub fn storage(&self) -> &StorageState {
        &self.storage
    }

    pub fn scheduler(&self) -> &SaveScheduler {
        &self.scheduler
    }

    /// Snapshot of the app data registry
    pub fn app_data(&self) -> AppData {
        self.session.app_data.read().clone()
    }

    /// Clone of the active document
    pub fn document(&self) -> Result<Document> {
        Ok(self.active()?.read().clone())
    }

    /// Read the active document without cloning it
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> Result<R> {
        let doc = self.active()?;
        let guard = doc.read();
        Ok(f(&guard))
    }

    // ============================================
    // MUTATION PLUMBING
    // ============================================

    pub(crate) fn active(&self) -> Result<DocumentRef> {
        self.session
            .active_document()
            .ok_or_else(|| UninoteError::validation("No document is open"))
    }

    /// Refuse any change while the app lock screen is up
    pub(crate) fn ensure_app_unlocked(&self) -> Result<()> {
        if self.session.security.is_app_locked() {
            return Err(UninoteError::validation("The app is locked"));
        }
        Ok(())
    }

    fn check_writable(&self, doc: &DocumentRef) -> Result<()> {
        self.ensure_app_unlocked()?;
        if doc.read().is_sealed() {
            return Err(UninoteError::validation("This document is password protected"));
        }
        Ok(())
    }

    /// Run a mutation on the active document under its write lock
    fn apply<R>(&self, f: impl FnOnce(&mut Document, &SecuritySession) -> Result<R>) -> Result<(R, DocumentRef)> {
        let doc = self.active()?;
        self.check_writable(&doc)?;
        let value = {
            let mut guard = doc.write();
            f(&mut guard, &self.session.security)?
        };
        Ok((value, doc))
    }

    /// Mutate, then let the debounce window decide when to save
    pub(crate) fn edit<R>(&self, f: impl FnOnce(&mut Document, &SecuritySession) -> Result<R>) -> Result<R> {
        let (value, doc) = self.apply(f)?;
        self.scheduler.schedule(&doc);
        Ok(value)
    }

    /// Mutate and save immediately. A failed save leaves the change in memory.
    pub(crate) async fn edit_now<R>(
        &self,
        f: impl FnOnce(&mut Document, &SecuritySession) -> Result<R>,
    ) -> Result<R> {
        let (value, doc) = self.apply(f)?;
        self.scheduler.save_now(&doc).await?;
        Ok(value)
    }

    pub(crate) async fn save_app_data(&self) -> Result<()> {
        let data = self.session.app_data.read().clone();
        self.storage.save_app_data(&data).await?;
        Ok(())
    }

    /// Save the active document now, cancelling any pending debounced save
    pub async fn flush(&self) -> Result<()> {
        let result = match self.session.active_document() {
            Some(doc) => self.scheduler.save_now(&doc).await,
            None => Ok(()),
        };
        self.report("flush", result)
    }

    // ============================================
    // OPERATION BOUNDARY
    // ============================================

    /// Lookup failures are only logged; everything else reaches the user
    pub(crate) fn report<T>(&self, op: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_lookup_failure() {
                warn!("[{}] {}", op, e);
            } else {
                warn!("[{}] Failed: {}", op, e);
                self.notifier.notify(NoticeLevel::Error, &e.to_string());
            }
        }
        result
    }

    pub(crate) fn inform(&self, level: NoticeLevel, message: &str) {
        self.notifier.notify(level, message);
    }
}
