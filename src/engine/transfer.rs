// Import and export: the JSON exchange format and Notion markdown lists

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::common::{new_id, now_iso};
use super::Engine;
use crate::error::{Result, UninoteError};
use crate::models::{AppData, Note, NoteStatus};
use crate::notify::NoticeLevel;

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`(.*?)`").unwrap());
static STRIKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~(.*?)~~").unwrap());

/// Single-document export file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentExport {
    pub document_name: String,
    pub notes: Vec<Note>,
}

/// Full backup: the registry plus every document's notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub app_data: AppData,
    pub all_notes_data: BTreeMap<String, Vec<Note>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Append the notes to the active document
    Merge,
    /// Create a document for them and switch to it
    NewDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    /// Drop every current document and restore the backup as is
    Replace,
    /// Add the backup's documents next to the current ones
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub document_name: String,
    pub note_count: usize,
}

/// Suggested file name for a document export
pub fn export_file_name(document_name: &str) -> String {
    format!("uninote_{}.json", document_name.replace(' ', "_"))
}

pub fn backup_file_name() -> String {
    format!("uninote_backup_total_{}.json", Utc::now().format("%Y-%m-%d"))
}

/// Validate the shape of a single-document export and decode it
pub fn parse_document_export(json: &str) -> Result<DocumentExport> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let has_name = value.get("documentName").and_then(|v| v.as_str()).is_some_and(|s| !s.trim().is_empty());
    let has_notes = value.get("notes").is_some_and(|v| v.is_array());
    if !has_name || !has_notes {
        return Err(UninoteError::validation("Invalid file: not a Uninote export"));
    }
    Ok(serde_json::from_value(value)?)
}

/// Give a fresh id to every note whose id is already taken, at any depth
fn reassign_colliding_ids(note: &mut Note, taken: &mut HashSet<String>) -> usize {
    let mut changed = 0;
    if !taken.insert(note.id.clone()) {
        note.id = new_id();
        taken.insert(note.id.clone());
        changed += 1;
    }
    note.normalize_lock();
    for child in &mut note.children {
        changed += reassign_colliding_ids(child, taken);
    }
    changed
}

/// A name not in `existing`: the name itself, else "<name> (Imported)", then numbered
fn available_name(name: &str, existing: &AppData) -> String {
    let name = name.trim();
    if !existing.has_document(name) {
        return name.to_string();
    }
    let imported = format!("{} (Imported)", name);
    if !existing.has_document(&imported) {
        return imported;
    }
    (2..)
        .map(|n| format!("{} (Imported {})", name, n))
        .find(|candidate| !existing.has_document(candidate))
        .unwrap_or(imported)
}

fn markdown_to_html(text: &str) -> String {
    let text = BOLD_RE.replace_all(text, "<b>$1</b>");
    let text = ITALIC_RE.replace_all(&text, "<i>$1</i>");
    let text = CODE_RE.replace_all(&text, "<code>$1</code>");
    STRIKE_RE.replace_all(&text, "<s>$1</s>").into_owned()
}

fn indent_level(line: &str) -> usize {
    let width: usize = line
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();
    width / 4
}

/// Turn a Notion markdown export into a note forest. Each non-blank line is
/// a note, nested by 4-space (or tab) indentation; `[x]` marks it done.
pub fn parse_notion_markdown(markdown: &str) -> Vec<Note> {
    fn close(stack: &mut Vec<Note>, roots: &mut Vec<Note>) {
        if let Some(note) = stack.pop() {
            match stack.last_mut() {
                Some(parent) => parent.children.push(note),
                None => roots.push(note),
            }
        }
    }

    let mut roots = Vec::new();
    let mut stack: Vec<Note> = Vec::new();

    for line in markdown.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let level = indent_level(line);
        let mut content = line.trim();
        content = content.strip_prefix('-').unwrap_or(content).trim();
        let mut status = NoteStatus::Todo;
        if let Some(rest) = content.strip_prefix("[x] ") {
            status = NoteStatus::Done;
            content = rest;
        } else if let Some(rest) = content.strip_prefix("[ ] ") {
            content = rest;
        }

        while level < stack.len() {
            close(&mut stack, &mut roots);
        }
        stack.push(Note {
            content: markdown_to_html(content),
            status,
            creation_date: now_iso(),
            ..Note::default()
        });
    }
    while !stack.is_empty() {
        close(&mut stack, &mut roots);
    }
    roots
}

impl Engine {
    // ============================================
    // EXPORT
    // ============================================

    /// Export the active document, writing pending edits first
    pub async fn export_document(&self) -> Result<DocumentExport> {
        let result = async {
            let doc = self.active()?;
            if doc.read().is_sealed() {
                return Err(UninoteError::validation("Unlock the document before exporting it"));
            }
            self.scheduler.save_now(&doc).await?;
            let guard = doc.read();
            Ok(DocumentExport {
                document_name: guard.name().to_string(),
                notes: guard.notes().to_vec(),
            })
        }
        .await;
        self.report("export_document", result)
    }

    /// Backup of every document, read back from storage after a flush
    pub async fn export_backup(&self) -> Result<Backup> {
        let result = async {
            if let Some(doc) = self.session.active_document() {
                self.scheduler.save_now(&doc).await?;
            }
            let app_data = self.app_data();
            let loaded = futures::future::join_all(
                app_data.documents.iter().map(|name| self.storage.load_document(name)),
            )
            .await;
            let mut all_notes_data = BTreeMap::new();
            for (name, notes) in app_data.documents.iter().zip(loaded) {
                all_notes_data.insert(name.clone(), notes?.unwrap_or_default());
            }
            info!("[export_backup] {} documents", all_notes_data.len());
            Ok(Backup {
                app_data,
                all_notes_data,
            })
        }
        .await;
        self.report("export_backup", result)
    }

    // ============================================
    // IMPORT
    // ============================================

    pub async fn import_document(&self, json: &str, mode: ImportMode) -> Result<ImportSummary> {
        let result = async {
            self.ensure_app_unlocked()?;
            let export = parse_document_export(json)?;
            match mode {
                ImportMode::Merge => self.merge_notes(export.notes).await,
                ImportMode::NewDocument => self.import_as_document(&export.document_name, export.notes).await,
            }
        }
        .await;
        if let Ok(summary) = &result {
            self.inform(
                NoticeLevel::Success,
                &format!("{} notes imported into '{}'", summary.note_count, summary.document_name),
            );
        }
        self.report("import_document", result)
    }

    /// Append a Notion markdown list to the active document
    pub async fn import_notion(&self, markdown: &str) -> Result<ImportSummary> {
        let result = async {
            let notes = parse_notion_markdown(markdown);
            if notes.is_empty() {
                return Err(UninoteError::validation("No list items found in the Notion file"));
            }
            self.merge_notes(notes).await
        }
        .await;
        if let Ok(summary) = &result {
            self.inform(
                NoticeLevel::Success,
                &format!("{} notes imported from Notion", summary.note_count),
            );
        }
        self.report("import_notion", result)
    }

    async fn merge_notes(&self, mut notes: Vec<Note>) -> Result<ImportSummary> {
        let count = notes.len();
        let document_name = self
            .edit_now(|doc, _| {
                let mut taken: HashSet<String> = doc.all_ids().into_iter().collect();
                let reassigned: usize = notes.iter_mut().map(|n| reassign_colliding_ids(n, &mut taken)).sum();
                if reassigned > 0 {
                    warn!("[import] Reassigned {} colliding note ids", reassigned);
                }
                for note in notes {
                    doc.push_top_level(note)?;
                }
                Ok(doc.name().to_string())
            })
            .await?;
        Ok(ImportSummary {
            document_name,
            note_count: count,
        })
    }

    async fn import_as_document(&self, name: &str, mut notes: Vec<Note>) -> Result<ImportSummary> {
        let name = available_name(name, &self.session.app_data.read());
        let mut taken = HashSet::new();
        for note in &mut notes {
            reassign_colliding_ids(note, &mut taken);
        }
        self.storage.save_document(&name, &notes).await?;
        self.session.app_data.write().add_document(&name);
        self.save_app_data().await?;
        self.switch_document_inner(&name, None).await?;
        info!("[import] Created '{}' with {} notes", name, notes.len());
        Ok(ImportSummary {
            document_name: name,
            note_count: notes.len(),
        })
    }

    /// Restore a full backup
    pub async fn import_backup(&self, json: &str, mode: BackupMode) -> Result<usize> {
        let result = async {
            self.ensure_app_unlocked()?;
            let backup: Backup = serde_json::from_str(json)?;
            if backup.app_data.documents.is_empty() {
                return Err(UninoteError::validation("Invalid backup: it lists no documents"));
            }
            match mode {
                BackupMode::Replace => self.replace_from_backup(backup).await,
                BackupMode::Merge => self.merge_backup(backup).await,
            }
        }
        .await;
        if let Ok(count) = &result {
            self.inform(NoticeLevel::Success, &format!("{} documents restored", count));
        }
        self.report("import_backup", result)
    }

    async fn replace_from_backup(&self, backup: Backup) -> Result<usize> {
        if let Some(doc) = self.session.active_document() {
            self.scheduler.cancel(doc.read().name());
        }
        let current = self.app_data();
        for name in current.documents.iter().filter(|n| !backup.app_data.has_document(n)) {
            self.storage.delete_document(name).await?;
        }
        for name in &backup.app_data.documents {
            let notes = backup.all_notes_data.get(name).cloned().unwrap_or_default();
            self.storage.save_document(name, &notes).await?;
        }

        let mut app_data = backup.app_data;
        if !app_data.active_document.as_ref().is_some_and(|a| app_data.has_document(a)) {
            app_data.active_document = app_data.documents.first().cloned();
        }
        let target = app_data.active_document.clone().unwrap_or_default();
        let count = app_data.documents.len();
        *self.session.app_data.write() = app_data;
        self.save_app_data().await?;

        self.session.security.clear_notes();
        self.open_document(&target).await?;
        info!("[import_backup] Replaced everything with {} documents", count);
        Ok(count)
    }

    async fn merge_backup(&self, backup: Backup) -> Result<usize> {
        let mut added = 0;
        for name in &backup.app_data.documents {
            let target = available_name(name, &self.session.app_data.read());
            let mut notes = backup.all_notes_data.get(name).cloned().unwrap_or_default();
            let mut taken = HashSet::new();
            for note in &mut notes {
                reassign_colliding_ids(note, &mut taken);
            }
            self.storage.save_document(&target, &notes).await?;
            {
                let mut data = self.session.app_data.write();
                data.add_document(&target);
                if let Some(hash) = backup.app_data.document_passwords.get(name) {
                    data.document_passwords.insert(target.clone(), hash.clone());
                }
            }
            added += 1;
        }
        self.save_app_data().await?;
        info!("[import_backup] Merged {} documents", added);
        Ok(added)
    }
}
