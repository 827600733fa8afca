// Document registry operations: open, switch, create, rename, delete

use serde::Serialize;
use tracing::{debug, info};

use super::Engine;
use crate::crypto;
use crate::error::{Result, UninoteError};
use crate::models::Document;
use crate::notify::NoticeLevel;
use crate::scheduler::DocumentRef;

/// Registry entry as a document picker shows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub name: String,
    pub is_active: bool,
    pub is_favorite: bool,
    pub is_default: bool,
    pub is_protected: bool,
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(UninoteError::validation("Document name cannot be empty"));
    }
    Ok(name.to_string())
}

impl Engine {
    /// Load a document into the session. Protected documents that have not
    /// been unlocked yet are installed sealed, without their notes.
    pub(crate) async fn open_document(&self, name: &str) -> Result<DocumentRef> {
        let protected = self.session.app_data.read().is_document_protected(name);
        if protected && !self.session.security.is_document_unlocked(name) {
            info!("[open_document] '{}' is password protected, opening sealed", name);
            return Ok(self.session.set_active(Document::sealed(name)));
        }

        let notes = self.storage.load_document(name).await?.unwrap_or_default();
        let mut doc = Document::new(name, notes);
        if !self.session.archive_view_active() {
            doc.ensure_active_note();
        }
        debug!("[open_document] Loaded '{}' ({} notes)", name, doc.total_count());
        Ok(self.session.set_active(doc))
    }

    pub fn list_documents(&self) -> Vec<DocumentInfo> {
        let active = self.session.active_name();
        let data = self.session.app_data.read();
        data.documents
            .iter()
            .map(|name| DocumentInfo {
                name: name.clone(),
                is_active: active.as_deref() == Some(name.as_str()),
                is_favorite: data.favorites.contains(name),
                is_default: data.default_document.as_deref() == Some(name.as_str()),
                is_protected: data.is_document_protected(name),
            })
            .collect()
    }

    /// Make `name` the active document. Pending edits of the current document
    /// are written first; a protected target needs its password once per session.
    pub async fn switch_document(&self, name: &str, password: Option<&str>) -> Result<()> {
        let result = self.switch_document_inner(name, password).await;
        self.report("switch_document", result)
    }

    pub(crate) async fn switch_document_inner(&self, name: &str, password: Option<&str>) -> Result<()> {
        self.ensure_app_unlocked()?;
        let stored_hash = {
            let data = self.session.app_data.read();
            if !data.has_document(name) {
                return Err(UninoteError::validation(format!("Document '{}' does not exist", name)));
            }
            data.document_password(name).cloned()
        };

        if let Some(current) = self.session.active_document() {
            let (same, sealed) = {
                let guard = current.read();
                (guard.name() == name, guard.is_sealed())
            };
            if same && !sealed {
                return Ok(());
            }
            self.scheduler.save_now(&current).await?;
        }

        if let Some(hash) = stored_hash {
            if !self.session.security.is_document_unlocked(name) {
                let candidate = password.unwrap_or_default().to_string();
                if !crypto::verify_password_async(candidate.clone(), hash.clone()).await {
                    return Err(UninoteError::Auth);
                }
                self.session.security.unlock_document(name);
                if hash.is_legacy() {
                    let upgraded =
                        crypto::hash_password_async(candidate, self.config.password_iterations).await?;
                    self.session
                        .app_data
                        .write()
                        .document_passwords
                        .insert(name.to_string(), upgraded);
                    info!("[switch_document] Upgraded legacy password hash of '{}'", name);
                }
            }
        }

        self.session.security.clear_notes();
        self.open_document(name).await?;
        self.session.app_data.write().active_document = Some(name.to_string());
        self.save_app_data().await?;
        info!("[switch_document] Switched to '{}'", name);
        Ok(())
    }

    pub async fn create_document(&self, name: &str) -> Result<()> {
        let result = self.create_document_inner(name).await;
        self.report("create_document", result)
    }

    async fn create_document_inner(&self, name: &str) -> Result<()> {
        self.ensure_app_unlocked()?;
        let name = clean_name(name)?;
        if self.session.app_data.read().has_document(&name) {
            return Err(UninoteError::validation(format!("A document named '{}' already exists", name)));
        }
        self.storage.save_document(&name, &[]).await?;
        self.session.app_data.write().add_document(&name);
        self.save_app_data().await?;
        info!("[create_document] Created '{}'", name);
        self.switch_document_inner(&name, None).await
    }

    /// Rename the active document
    pub async fn rename_document(&self, new_name: &str) -> Result<()> {
        let result = self.rename_document_inner(new_name).await;
        self.report("rename_document", result)
    }

    async fn rename_document_inner(&self, new_name: &str) -> Result<()> {
        self.ensure_app_unlocked()?;
        let new_name = clean_name(new_name)?;
        let doc = self.active()?;
        let old_name = doc.read().name().to_string();
        if old_name == new_name {
            return Ok(());
        }
        if self.session.app_data.read().has_document(&new_name) {
            return Err(UninoteError::validation(format!(
                "A document named '{}' already exists",
                new_name
            )));
        }
        if doc.read().is_sealed() {
            return Err(UninoteError::validation("Unlock the document before renaming it"));
        }

        self.scheduler.save_now(&doc).await?;
        // Renamed in memory before the writes so later saves target the new key
        let notes = {
            let mut guard = doc.write();
            guard.set_name(new_name.clone());
            guard.notes().to_vec()
        };
        self.scheduler.cancel(&old_name);
        let written = match self.storage.save_document(&new_name, &notes).await {
            Ok(()) => self.storage.delete_document(&old_name).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            self.scheduler.cancel(&new_name);
            doc.write().set_name(old_name.clone());
            return Err(e.into());
        }

        self.session.app_data.write().rename_document(&old_name, &new_name);
        self.session.security.rename_document(&old_name, &new_name);
        self.save_app_data().await?;
        info!("[rename_document] '{}' -> '{}'", old_name, new_name);
        Ok(())
    }

    /// Delete a document; the last remaining one cannot be deleted
    pub async fn delete_document(&self, name: &str) -> Result<()> {
        let result = self.delete_document_inner(name).await;
        self.report("delete_document", result)
    }

    async fn delete_document_inner(&self, name: &str) -> Result<()> {
        self.ensure_app_unlocked()?;
        {
            let data = self.session.app_data.read();
            if !data.has_document(name) {
                return Err(UninoteError::validation(format!("Document '{}' does not exist", name)));
            }
            if data.documents.len() <= 1 {
                return Err(UninoteError::validation("The last document cannot be deleted"));
            }
        }

        let was_active = self.session.active_name().as_deref() == Some(name);
        if was_active {
            self.scheduler.cancel(name);
        }
        self.storage.delete_document(name).await?;
        self.session.app_data.write().remove_document(name);
        self.session.security.relock_document(name);
        info!("[delete_document] Deleted '{}'", name);

        if was_active {
            let next = self.session.app_data.read().documents.first().cloned();
            if let Some(next) = next {
                self.session.security.clear_notes();
                self.open_document(&next).await?;
                self.session.app_data.write().active_document = Some(next);
            }
        }
        self.save_app_data().await?;
        self.inform(NoticeLevel::Success, &format!("Document '{}' deleted", name));
        Ok(())
    }

    /// Returns true when the document is a favorite afterwards
    pub async fn toggle_favorite(&self, name: &str) -> Result<bool> {
        let result = async {
            self.ensure_app_unlocked()?;
            let favorite = {
                let mut data = self.session.app_data.write();
                if !data.has_document(name) {
                    return Err(UninoteError::validation(format!("Document '{}' does not exist", name)));
                }
                data.toggle_favorite(name)
            };
            self.save_app_data().await?;
            Ok(favorite)
        }
        .await;
        self.report("toggle_favorite", result)
    }

    pub async fn set_default_document(&self, name: Option<&str>) -> Result<()> {
        let result = async {
            self.ensure_app_unlocked()?;
            {
                let mut data = self.session.app_data.write();
                if let Some(name) = name {
                    if !data.has_document(name) {
                        return Err(UninoteError::validation(format!("Document '{}' does not exist", name)));
                    }
                }
                data.default_document = name.map(str::to_string);
            }
            self.save_app_data().await
        }
        .await;
        self.report("set_default_document", result)
    }
}
