// Note locks, document passwords, shared passwords and the app lock
// Locks gate what the UI shows and lets the user edit; note content is not encrypted

use tracing::{debug, info, warn};

use super::Engine;
use super::common::{plain_text, prefix_chars};
use crate::crypto;
use crate::error::{Result, UninoteError};
use crate::models::{Document, LockType, Note, NoteHandle, PasswordHash};
use crate::notify::NoticeLevel;

const HINT_CHARS: usize = 30;
const DEFAULT_SHARED_HINT: &str = "Locked note";
const DEFAULT_EXCLUSIVE_HINT: &str = "Locked content";

/// How a note gets locked
#[derive(Debug, Clone)]
pub enum LockRequest {
    /// Reuse the universal password
    Universal,
    /// Reuse the password of the active document
    Document,
    /// Note-specific password
    Exclusive {
        password: String,
        confirmation: String,
        hint: Option<String>,
    },
}

/// App-wide shared secrets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretScope {
    /// Used by notes locked with the universal type
    Universal,
    /// Guards the app lock screen
    Master,
}

impl SecretScope {
    fn label(self) -> &'static str {
        match self {
            Self::Universal => "universal password",
            Self::Master => "master password",
        }
    }
}

fn shared_hint(note: &Note) -> String {
    let text = prefix_chars(&plain_text(&note.content), HINT_CHARS);
    let text = text.trim();
    if text.is_empty() {
        DEFAULT_SHARED_HINT.to_string()
    } else {
        text.to_string()
    }
}

impl Engine {
    // ============================================
    // NOTE LOCKS
    // ============================================

    pub fn is_note_locked(&self, note: &Note) -> bool {
        self.session.security.is_locked(note)
    }

    /// What may be shown for a note: its hint while locked, else its content
    pub fn display_text(&self, note: &Note) -> String {
        if self.is_note_locked(note) {
            note.lock_hint.clone()
        } else {
            note.content.clone()
        }
    }

    pub async fn lock_note(&self, handle: &NoteHandle, request: LockRequest) -> Result<()> {
        let result = self.lock_note_inner(handle, request).await;
        self.report("lock_note", result)
    }

    async fn lock_note_inner(&self, handle: &NoteHandle, request: LockRequest) -> Result<()> {
        let doc = self.active()?;
        self.check_writable(&doc)?;
        let (doc_name, already_locked) = {
            let guard = doc.read();
            let note = guard.note(handle)?;
            (guard.name().to_string(), note.is_lock_protected())
        };
        if already_locked {
            return Err(UninoteError::validation("Remove the existing lock first"));
        }

        let (lock_type, hash, custom_hint) = match request {
            LockRequest::Universal => {
                let hash = self
                    .session
                    .app_data
                    .read()
                    .universal_password_hash
                    .clone()
                    .ok_or_else(|| UninoteError::validation("Set a universal password first"))?;
                (LockType::Universal, hash, None)
            }
            LockRequest::Document => {
                let hash = self
                    .session
                    .app_data
                    .read()
                    .document_password(&doc_name)
                    .cloned()
                    .ok_or_else(|| UninoteError::validation("Set a password for this document first"))?;
                (LockType::Document, hash, None)
            }
            LockRequest::Exclusive {
                password,
                confirmation,
                hint,
            } => {
                crypto::validate_new_password(&password, &confirmation)?;
                let hash = crypto::hash_password_async(password, self.config.password_iterations).await?;
                (LockType::Exclusive, hash, hint)
            }
        };

        {
            let mut guard = doc.write();
            let note = guard.note_mut(handle)?;
            let hint = match (custom_hint, lock_type) {
                (Some(hint), _) if !hint.trim().is_empty() => hint.trim().to_string(),
                (_, LockType::Exclusive) => DEFAULT_EXCLUSIVE_HINT.to_string(),
                _ => shared_hint(note),
            };
            note.set_lock(lock_type, hash, hint);
        }
        self.session.security.relock_note(&handle.id);
        self.scheduler.save_now(&doc).await?;
        info!("[lock_note] Locked {} ({:?})", handle.id, lock_type);
        Ok(())
    }

    /// Verify the password and unlock the note for this session.
    /// A wrong password returns Ok(false) and changes nothing.
    pub async fn unlock_note(&self, handle: &NoteHandle, password: &str) -> Result<bool> {
        let result = self.unlock_note_inner(handle, password).await;
        self.report("unlock_note", result)
    }

    async fn unlock_note_inner(&self, handle: &NoteHandle, password: &str) -> Result<bool> {
        let doc = self.active()?;
        let stored = locked_hash(&doc.read(), handle)?;

        if !crypto::verify_password_async(password.to_string(), stored.clone()).await {
            self.inform(NoticeLevel::Error, "Incorrect password");
            return Ok(false);
        }
        self.session.security.unlock_note(&handle.id);
        debug!("[unlock_note] {} unlocked for this session", handle.id);

        if stored.is_legacy() {
            let upgraded = crypto::hash_password_async(password.to_string(), self.config.password_iterations).await?;
            let applied = {
                let mut guard = doc.write();
                match guard.note_mut(handle) {
                    Ok(note) if note.password_hash.as_ref() == Some(&stored) => {
                        note.password_hash = Some(upgraded);
                        true
                    }
                    Ok(_) => false,
                    Err(e) => {
                        warn!("[unlock_note] Skipping hash upgrade: {}", e);
                        false
                    }
                }
            };
            if applied {
                info!("[unlock_note] Upgraded legacy hash of {}", handle.id);
                self.scheduler.schedule(&doc);
            }
        }
        Ok(true)
    }

    /// Verify the password and strip the lock from the note for good
    pub async fn remove_lock(&self, handle: &NoteHandle, password: &str) -> Result<bool> {
        let result = self.remove_lock_inner(handle, password).await;
        self.report("remove_lock", result)
    }

    async fn remove_lock_inner(&self, handle: &NoteHandle, password: &str) -> Result<bool> {
        let doc = self.active()?;
        self.check_writable(&doc)?;
        let stored = locked_hash(&doc.read(), handle)?;

        if !crypto::verify_password_async(password.to_string(), stored).await {
            self.inform(NoticeLevel::Error, "Incorrect password");
            return Ok(false);
        }
        doc.write().note_mut(handle)?.clear_lock();
        self.session.security.relock_note(&handle.id);
        self.scheduler.save_now(&doc).await?;
        info!("[remove_lock] Lock removed from {}", handle.id);
        Ok(true)
    }

    /// Forget the session unlock of a note
    pub fn relock_note(&self, id: &str) {
        self.session.security.relock_note(id);
    }

    // ============================================
    // SHARED PASSWORDS
    // ============================================

    fn secret(&self, scope: SecretScope) -> Option<PasswordHash> {
        let data = self.session.app_data.read();
        match scope {
            SecretScope::Universal => data.universal_password_hash.clone(),
            SecretScope::Master => data.app_lock_password_hash.clone(),
        }
    }

    fn set_secret(&self, scope: SecretScope, hash: Option<PasswordHash>) {
        let mut data = self.session.app_data.write();
        match scope {
            SecretScope::Universal => data.universal_password_hash = hash,
            SecretScope::Master => {
                if hash.is_none() {
                    data.is_app_lock_enabled = false;
                }
                data.app_lock_password_hash = hash;
            }
        }
    }

    pub fn has_password(&self, scope: SecretScope) -> bool {
        self.secret(scope).is_some()
    }

    pub async fn create_password(&self, scope: SecretScope, password: &str, confirmation: &str) -> Result<()> {
        let result = async {
            self.ensure_app_unlocked()?;
            if self.has_password(scope) {
                return Err(UninoteError::validation(format!(
                    "A {} is already set",
                    scope.label()
                )));
            }
            crypto::validate_new_password(password, confirmation)?;
            let hash = crypto::hash_password_async(password.to_string(), self.config.password_iterations).await?;
            self.set_secret(scope, Some(hash));
            self.save_app_data().await?;
            info!("[create_password] {} created", scope.label());
            Ok(())
        }
        .await;
        self.report("create_password", result)
    }

    pub async fn change_password(
        &self,
        scope: SecretScope,
        current: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<bool> {
        let result = async {
            self.ensure_app_unlocked()?;
            let stored = self
                .secret(scope)
                .ok_or_else(|| UninoteError::validation(format!("No {} is set", scope.label())))?;
            crypto::validate_new_password(password, confirmation)?;
            if !crypto::verify_password_async(current.to_string(), stored).await {
                self.inform(NoticeLevel::Error, "Incorrect password");
                return Ok(false);
            }
            let hash = crypto::hash_password_async(password.to_string(), self.config.password_iterations).await?;
            self.set_secret(scope, Some(hash));
            self.save_app_data().await?;
            info!("[change_password] {} changed", scope.label());
            Ok(true)
        }
        .await;
        self.report("change_password", result)
    }

    pub async fn remove_password(&self, scope: SecretScope, current: &str) -> Result<bool> {
        let result = async {
            self.ensure_app_unlocked()?;
            let stored = self
                .secret(scope)
                .ok_or_else(|| UninoteError::validation(format!("No {} is set", scope.label())))?;
            if !crypto::verify_password_async(current.to_string(), stored).await {
                self.inform(NoticeLevel::Error, "Incorrect password");
                return Ok(false);
            }
            self.set_secret(scope, None);
            self.save_app_data().await?;
            info!("[remove_password] {} removed", scope.label());
            Ok(true)
        }
        .await;
        self.report("remove_password", result)
    }

    // ============================================
    // APP LOCK
    // ============================================

    pub async fn enable_app_lock(&self) -> Result<()> {
        let result = async {
            if !self.has_password(SecretScope::Master) {
                return Err(UninoteError::validation("Create a master password first"));
            }
            self.session.app_data.write().is_app_lock_enabled = true;
            self.save_app_data().await
        }
        .await;
        self.report("enable_app_lock", result)
    }

    pub async fn disable_app_lock(&self, password: &str) -> Result<bool> {
        let result = async {
            let Some(stored) = self.secret(SecretScope::Master) else {
                return Err(UninoteError::validation("No master password is set"));
            };
            if !crypto::verify_password_async(password.to_string(), stored).await {
                self.inform(NoticeLevel::Error, "Incorrect password");
                return Ok(false);
            }
            self.session.app_data.write().is_app_lock_enabled = false;
            self.session.security.set_app_locked(false);
            self.save_app_data().await?;
            Ok(true)
        }
        .await;
        self.report("disable_app_lock", result)
    }

    /// Lock the whole app now; pending edits are written first
    pub async fn lock_app(&self) -> Result<()> {
        let result = async {
            if !self.session.app_data.read().is_app_lock_enabled {
                return Err(UninoteError::validation("App lock is not enabled"));
            }
            if let Some(doc) = self.session.active_document() {
                self.scheduler.save_now(&doc).await?;
            }
            self.session.security.set_app_locked(true);
            info!("[lock_app] App locked");
            Ok(())
        }
        .await;
        self.report("lock_app", result)
    }

    pub async fn unlock_app(&self, password: &str) -> Result<bool> {
        let result = async {
            let Some(stored) = self.secret(SecretScope::Master) else {
                self.session.security.set_app_locked(false);
                return Ok(true);
            };
            if !crypto::verify_password_async(password.to_string(), stored).await {
                self.inform(NoticeLevel::Error, "Incorrect password");
                return Ok(false);
            }
            self.session.security.set_app_locked(false);
            Ok(true)
        }
        .await;
        self.report("unlock_app", result)
    }

    pub fn is_app_locked(&self) -> bool {
        self.session.security.is_app_locked()
    }

    // ============================================
    // DOCUMENT PASSWORDS
    // ============================================

    fn active_unsealed_name(&self) -> Result<String> {
        let doc = self.active()?;
        let guard = doc.read();
        if guard.is_sealed() {
            return Err(UninoteError::validation("Unlock the document first"));
        }
        Ok(guard.name().to_string())
    }

    /// Protect the active document with a password
    pub async fn set_document_password(&self, password: &str, confirmation: &str) -> Result<()> {
        let result = async {
            self.ensure_app_unlocked()?;
            let name = self.active_unsealed_name()?;
            if self.session.app_data.read().is_document_protected(&name) {
                return Err(UninoteError::validation("This document already has a password"));
            }
            crypto::validate_new_password(password, confirmation)?;
            let hash = crypto::hash_password_async(password.to_string(), self.config.password_iterations).await?;
            self.session
                .app_data
                .write()
                .document_passwords
                .insert(name.clone(), hash);
            self.session.security.unlock_document(&name);
            self.save_app_data().await?;
            info!("[set_document_password] '{}' is now protected", name);
            Ok(())
        }
        .await;
        self.report("set_document_password", result)
    }

    pub async fn change_document_password(&self, current: &str, password: &str, confirmation: &str) -> Result<bool> {
        let result = async {
            self.ensure_app_unlocked()?;
            let name = self.active_unsealed_name()?;
            let stored = self
                .session
                .app_data
                .read()
                .document_password(&name)
                .cloned()
                .ok_or_else(|| UninoteError::validation("This document has no password"))?;
            crypto::validate_new_password(password, confirmation)?;
            if !crypto::verify_password_async(current.to_string(), stored).await {
                self.inform(NoticeLevel::Error, "Incorrect password");
                return Ok(false);
            }
            let hash = crypto::hash_password_async(password.to_string(), self.config.password_iterations).await?;
            self.session.app_data.write().document_passwords.insert(name, hash);
            self.save_app_data().await?;
            Ok(true)
        }
        .await;
        self.report("change_document_password", result)
    }

    pub async fn remove_document_password(&self, current: &str) -> Result<bool> {
        let result = async {
            self.ensure_app_unlocked()?;
            let name = self.active_unsealed_name()?;
            let stored = self
                .session
                .app_data
                .read()
                .document_password(&name)
                .cloned()
                .ok_or_else(|| UninoteError::validation("This document has no password"))?;
            if !crypto::verify_password_async(current.to_string(), stored).await {
                self.inform(NoticeLevel::Error, "Incorrect password");
                return Ok(false);
            }
            self.session.app_data.write().document_passwords.remove(&name);
            self.session.security.relock_document(&name);
            self.save_app_data().await?;
            info!("[remove_document_password] '{}' is no longer protected", name);
            Ok(true)
        }
        .await;
        self.report("remove_document_password", result)
    }

    /// Open the sealed active document with its password
    pub async fn unlock_document(&self, password: &str) -> Result<bool> {
        let Some(name) = self.session.active_name() else {
            return self.report("unlock_document", Err(UninoteError::validation("No document is open")));
        };
        match self.switch_document(&name, Some(password)).await {
            Ok(()) => Ok(true),
            Err(UninoteError::Auth) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Forget the session unlock of the active document and seal it again
    pub async fn relock_document(&self) -> Result<()> {
        let result = async {
            let doc = self.active()?;
            let name = doc.read().name().to_string();
            if !self.session.app_data.read().is_document_protected(&name) {
                return Err(UninoteError::validation("This document has no password"));
            }
            self.scheduler.save_now(&doc).await?;
            self.session.security.relock_document(&name);
            self.session.security.clear_notes();
            self.session.set_active(Document::sealed(name.clone()));
            info!("[relock_document] '{}' sealed", name);
            Ok(())
        }
        .await;
        self.report("relock_document", result)
    }
}

fn locked_hash(doc: &Document, handle: &NoteHandle) -> Result<PasswordHash> {
    let note = doc.note(handle)?;
    match (&note.lock_type, &note.password_hash) {
        (Some(_), Some(hash)) => Ok(hash.clone()),
        _ => Err(UninoteError::validation("Note is not locked")),
    }
}
