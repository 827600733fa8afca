// App-wide registry of documents, favorites and password settings

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::password::PasswordHash;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default)]
    pub active_document: Option<String>,
    #[serde(default)]
    pub default_document: Option<String>,
    #[serde(default)]
    pub document_passwords: BTreeMap<String, PasswordHash>,
    #[serde(default)]
    pub universal_password_hash: Option<PasswordHash>,
    #[serde(default, alias = "masterPasswordHash")]
    pub app_lock_password_hash: Option<PasswordHash>,
    #[serde(default)]
    pub is_app_lock_enabled: bool,
}

impl AppData {
    /// First-run state: a single empty document, active
    pub fn first_run(document_name: &str) -> Self {
        Self {
            documents: vec![document_name.to_string()],
            active_document: Some(document_name.to_string()),
            ..Self::default()
        }
    }

    pub fn has_document(&self, name: &str) -> bool {
        self.documents.iter().any(|d| d == name)
    }

    pub fn add_document(&mut self, name: &str) {
        if !self.has_document(name) {
            self.documents.push(name.to_string());
        }
    }

    pub fn remove_document(&mut self, name: &str) {
        self.documents.retain(|d| d != name);
        self.favorites.retain(|f| f != name);
        self.document_passwords.remove(name);
        if self.default_document.as_deref() == Some(name) {
            self.default_document = None;
        }
        if self.active_document.as_deref() == Some(name) {
            self.active_document = self.documents.first().cloned();
        }
    }

    pub fn rename_document(&mut self, old: &str, new: &str) {
        for entry in self.documents.iter_mut().chain(self.favorites.iter_mut()) {
            if entry == old {
                *entry = new.to_string();
            }
        }
        if let Some(hash) = self.document_passwords.remove(old) {
            self.document_passwords.insert(new.to_string(), hash);
        }
        if self.default_document.as_deref() == Some(old) {
            self.default_document = Some(new.to_string());
        }
        if self.active_document.as_deref() == Some(old) {
            self.active_document = Some(new.to_string());
        }
    }

    /// Returns true when the document is a favorite afterwards
    pub fn toggle_favorite(&mut self, name: &str) -> bool {
        if let Some(pos) = self.favorites.iter().position(|f| f == name) {
            self.favorites.remove(pos);
            false
        } else {
            self.favorites.push(name.to_string());
            true
        }
    }

    pub fn document_password(&self, name: &str) -> Option<&PasswordHash> {
        self.document_passwords.get(name)
    }

    pub fn is_document_protected(&self, name: &str) -> bool {
        self.document_passwords.contains_key(name)
    }
}
