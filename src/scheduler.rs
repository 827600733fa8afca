// Debounced, per-document serialized document saves

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::Result;
use crate::models::Document;
use crate::notify::{NoticeLevel, NotificationSink};
use crate::storage::StorageState;

/// Shared handle to an in-memory document
pub type DocumentRef = Arc<RwLock<Document>>;

struct Pending {
    seq: u64,
    token: CancellationToken,
}

struct SchedulerInner {
    storage: StorageState,
    notifier: Arc<dyn NotificationSink>,
    debounce: Duration,
    initializing: AtomicBool,
    seq: AtomicU64,
    pending: Mutex<HashMap<String, Pending>>,
    writers: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Coalesces bursts of mutations into one write per quiet period.
/// Starts in the initializing state, where every save request is dropped.
#[derive(Clone)]
pub struct SaveScheduler {
    inner: Arc<SchedulerInner>,
}

impl SaveScheduler {
    pub fn new(storage: StorageState, notifier: Arc<dyn NotificationSink>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                storage,
                notifier,
                debounce,
                initializing: AtomicBool::new(true),
                seq: AtomicU64::new(0),
                pending: Mutex::new(HashMap::new()),
                writers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    pub fn is_initializing(&self) -> bool {
        self.inner.initializing.load(Ordering::SeqCst)
    }

    /// Leave the initializing state. Returns false if it was already left.
    pub fn finish_initialization(&self) -> bool {
        let was = self.inner.initializing.swap(false, Ordering::SeqCst);
        if was {
            debug!("[SaveScheduler] Initialization finished, saves enabled");
        }
        was
    }

    pub fn has_pending(&self, name: &str) -> bool {
        self.inner.pending.lock().contains_key(name)
    }

    /// Drop the pending debounced save for a document, if any
    pub fn cancel(&self, name: &str) -> bool {
        match self.inner.pending.lock().remove(name) {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    /// (Re)start the quiet period for a document. The write happens once no
    /// further request for the same document arrives within the window.
    pub fn schedule(&self, doc: &DocumentRef) {
        if self.is_initializing() {
            debug!("[SaveScheduler::schedule] Suppressed during initialization");
            return;
        }
        let name = {
            let guard = doc.read();
            if guard.is_sealed() {
                return;
            }
            guard.name().to_string()
        };

        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();
        let previous = self.inner.pending.lock().insert(
            name.clone(),
            Pending {
                seq,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }

        let this = self.clone();
        let doc = doc.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(this.inner.debounce) => {}
            }
            if !this.take_pending(&name, seq) {
                return;
            }
            if let Err(e) = this.write(&doc).await {
                this.inner
                    .notifier
                    .notify(NoticeLevel::Error, &format!("Could not save '{}': {}", name, e));
            }
        });
    }

    /// Cancel any pending save and write the current state right away
    pub async fn save_now(&self, doc: &DocumentRef) -> Result<()> {
        let name = doc.read().name().to_string();
        self.cancel(&name);
        self.write(doc).await
    }

    fn take_pending(&self, name: &str, seq: u64) -> bool {
        let mut pending = self.inner.pending.lock();
        match pending.get(name) {
            Some(entry) if entry.seq == seq => {
                pending.remove(name);
                true
            }
            _ => false,
        }
    }

    fn writer_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.inner
            .writers
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// One writer per document at a time; the snapshot is taken once the
    /// writer slot is held, so later writes always carry newer state.
    async fn write(&self, doc: &DocumentRef) -> Result<()> {
        if self.is_initializing() {
            debug!("[SaveScheduler::write] Suppressed during initialization");
            return Ok(());
        }
        let name = doc.read().name().to_string();
        let writer = self.writer_for(&name);
        let _slot = writer.lock().await;

        let notes = {
            let guard = doc.read();
            if guard.is_sealed() {
                return Ok(());
            }
            guard.notes().to_vec()
        };

        match self.inner.storage.save_document(&name, &notes).await {
            Ok(()) => {
                debug!("[SaveScheduler::write] Saved '{}'", name);
                Ok(())
            }
            Err(e) => {
                error!("[SaveScheduler::write] Failed to save '{}': {}", name, e);
                Err(e.into())
            }
        }
    }
}
