// Per-process session state shared by engine operations
// Split into owned regions: app data, the active document, security and UI hints

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::models::{AppData, ButtonConfig, Document, Note};
use crate::scheduler::DocumentRef;

/// Ephemeral unlock state, never persisted
#[derive(Debug, Default)]
pub struct SecuritySession {
    unlocked_notes: RwLock<HashSet<String>>,
    unlocked_documents: RwLock<HashSet<String>>,
    app_locked: AtomicBool,
}

impl SecuritySession {
    pub fn is_note_unlocked(&self, id: &str) -> bool {
        self.unlocked_notes.read().contains(id)
    }

    pub fn unlock_note(&self, id: &str) {
        self.unlocked_notes.write().insert(id.to_string());
    }

    /// Forget a temporary unlock; repeated calls are harmless
    pub fn relock_note(&self, id: &str) -> bool {
        self.unlocked_notes.write().remove(id)
    }

    pub fn clear_notes(&self) {
        self.unlocked_notes.write().clear();
    }

    pub fn unlocked_note_count(&self) -> usize {
        self.unlocked_notes.read().len()
    }

    /// Locked and not unlocked in this session
    pub fn is_locked(&self, note: &Note) -> bool {
        note.is_lock_protected() && !self.is_note_unlocked(&note.id)
    }

    pub fn is_document_unlocked(&self, name: &str) -> bool {
        self.unlocked_documents.read().contains(name)
    }

    pub fn unlock_document(&self, name: &str) {
        self.unlocked_documents.write().insert(name.to_string());
    }

    pub fn relock_document(&self, name: &str) -> bool {
        self.unlocked_documents.write().remove(name)
    }

    pub fn rename_document(&self, old: &str, new: &str) {
        let mut docs = self.unlocked_documents.write();
        if docs.remove(old) {
            docs.insert(new.to_string());
        }
    }

    pub fn is_app_locked(&self) -> bool {
        self.app_locked.load(Ordering::SeqCst)
    }

    pub fn set_app_locked(&self, locked: bool) {
        self.app_locked.store(locked, Ordering::SeqCst);
    }
}

/// View-level hints the engine needs to honour
#[derive(Debug, Default, Clone)]
pub struct UiHints {
    pub archive_view_active: bool,
}

/// Persisted user preferences mirrored in memory
#[derive(Debug, Default, Clone)]
pub struct Preferences {
    pub recent_icons: VecDeque<String>,
    pub seen_notifications: BTreeSet<String>,
    pub button_config: ButtonConfig,
    pub theme: Option<String>,
}

pub struct AppSession {
    pub app_data: RwLock<AppData>,
    active: RwLock<Option<DocumentRef>>,
    pub security: SecuritySession,
    pub ui: RwLock<UiHints>,
    pub preferences: RwLock<Preferences>,
}

impl Default for AppSession {
    fn default() -> Self {
        Self::new(AppData::default())
    }
}

impl AppSession {
    pub fn new(app_data: AppData) -> Self {
        Self {
            app_data: RwLock::new(app_data),
            active: RwLock::new(None),
            security: SecuritySession::default(),
            ui: RwLock::new(UiHints::default()),
            preferences: RwLock::new(Preferences::default()),
        }
    }

    pub fn active_document(&self) -> Option<DocumentRef> {
        self.active.read().clone()
    }

    pub fn active_name(&self) -> Option<String> {
        self.active.read().as_ref().map(|doc| doc.read().name().to_string())
    }

    pub(crate) fn set_active(&self, document: Document) -> DocumentRef {
        let doc = Arc::new(RwLock::new(document));
        *self.active.write() = Some(doc.clone());
        doc
    }

    pub fn archive_view_active(&self) -> bool {
        self.ui.read().archive_view_active
    }
}
