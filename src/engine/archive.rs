// Archive: flag notes archived, list them across documents, restore them

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::Engine;
use super::tree;
use crate::error::{Result, UninoteError};
use crate::models::{Document, Note, NoteHandle};
use crate::notify::NoticeLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveSort {
    /// Most recently archived first
    #[default]
    Archived,
    /// Most recently created first
    Created,
}

/// An archived note and the document it currently lives in
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedNote {
    pub document_name: String,
    pub note: Note,
}

fn collect_archived(notes: &[Note], document_name: &str, out: &mut Vec<ArchivedNote>) {
    for note in notes {
        if note.is_archived {
            out.push(ArchivedNote {
                document_name: document_name.to_string(),
                note: note.clone(),
            });
        } else {
            collect_archived(&note.children, document_name, out);
        }
    }
}

impl Engine {
    /// Archive a note. When that leaves no active top-level note the
    /// archive view is switched on; returns whether that happened.
    pub fn archive_note(&self, handle: &NoteHandle) -> Result<bool> {
        let result = self.edit(|doc, security| {
            tree::ensure_unlocked(security, doc.note(handle)?)?;
            tree::archive(doc, handle)
        });
        let emptied = self.report("archive_note", result)?;
        if emptied {
            self.session.ui.write().archive_view_active = true;
            self.inform(NoticeLevel::Info, "All notes are archived, showing the archive");
        }
        Ok(emptied)
    }

    /// Archived notes of every document this session can read
    pub async fn archived_notes(&self, sort: ArchiveSort) -> Result<Vec<ArchivedNote>> {
        let result = self.archived_notes_inner(sort).await;
        self.report("archived_notes", result)
    }

    async fn archived_notes_inner(&self, sort: ArchiveSort) -> Result<Vec<ArchivedNote>> {
        let mut out = Vec::new();
        let active = self.session.active_document();
        let active_name = active.as_ref().map(|doc| doc.read().name().to_string());

        if let Some(doc) = &active {
            let guard = doc.read();
            if !guard.is_sealed() {
                collect_archived(guard.notes(), guard.name(), &mut out);
            }
        }

        let others: Vec<String> = self
            .readable_documents()
            .into_iter()
            .filter(|name| Some(name) != active_name.as_ref())
            .collect();
        let loaded = join_all(others.iter().map(|name| self.storage.load_document(name))).await;
        for (name, notes) in others.iter().zip(loaded) {
            match notes {
                Ok(Some(notes)) => collect_archived(&notes, name, &mut out),
                Ok(None) => {}
                Err(e) => warn!("[archived_notes] Skipping '{}': {}", name, e),
            }
        }

        match sort {
            ArchiveSort::Archived => out.sort_by(|a, b| {
                b.note
                    .archived_timestamp
                    .as_deref()
                    .unwrap_or_default()
                    .cmp(a.note.archived_timestamp.as_deref().unwrap_or_default())
            }),
            ArchiveSort::Created => out.sort_by(|a, b| b.note.creation_date.cmp(&a.note.creation_date)),
        }
        debug!("[archived_notes] {} archived notes", out.len());
        Ok(out)
    }

    /// Documents that are not protected, or unlocked in this session
    pub(crate) fn readable_documents(&self) -> Vec<String> {
        let data = self.session.app_data.read();
        data.documents
            .iter()
            .filter(|name| !data.is_document_protected(name) || self.session.security.is_document_unlocked(name))
            .cloned()
            .collect()
    }

    /// Restore an archived note, appending it to the top level of
    /// `target_document` (its current document when `None`).
    pub async fn unarchive(&self, note_id: &str, source_document: &str, target_document: Option<&str>) -> Result<()> {
        let result = self
            .unarchive_inner(note_id, source_document, target_document.unwrap_or(source_document))
            .await;
        self.report("unarchive", result)
    }

    async fn unarchive_inner(&self, note_id: &str, source: &str, target: &str) -> Result<()> {
        self.ensure_app_unlocked()?;
        let readable = self.readable_documents();
        for name in [source, target] {
            if !readable.iter().any(|d| d == name) {
                return Err(UninoteError::validation(format!("Document '{}' is not available", name)));
            }
        }

        let active = self
            .session
            .active_document()
            .filter(|doc| !doc.read().is_sealed());
        let active_name = active.as_ref().map(|doc| doc.read().name().to_string());
        let is_active = |name: &str| active_name.as_deref() == Some(name);

        // Same document: move in place
        if source == target {
            if let (true, Some(doc)) = (is_active(source), &active) {
                {
                    let mut guard = doc.write();
                    check_archived(&guard, note_id)?;
                    guard.relocate(note_id, None, usize::MAX)?;
                    if let Some(note) = guard.get_mut(note_id) {
                        note.unarchive();
                    }
                }
                self.scheduler.save_now(doc).await?;
            } else {
                let mut doc = self.load_stored(source).await?;
                check_archived(&doc, note_id)?;
                doc.relocate(note_id, None, usize::MAX)?;
                if let Some(note) = doc.get_mut(note_id) {
                    note.unarchive();
                }
                self.storage.save_document(source, doc.notes()).await?;
            }
            info!("[unarchive] Restored {} in '{}'", note_id, source);
            return Ok(());
        }

        // Cross-document: write the target before removing from the source
        let mut note = match (is_active(source), &active) {
            (true, Some(doc)) => {
                let guard = doc.read();
                check_archived(&guard, note_id)?;
                guard.get(note_id).cloned().ok_or_else(|| UninoteError::not_found(note_id))?
            }
            _ => {
                let doc = self.load_stored(source).await?;
                check_archived(&doc, note_id)?;
                doc.get(note_id).cloned().ok_or_else(|| UninoteError::not_found(note_id))?
            }
        };
        note.unarchive();

        match (is_active(target), &active) {
            (true, Some(doc)) => {
                doc.write().push_top_level(note)?;
                self.scheduler.save_now(doc).await?;
            }
            _ => {
                let mut doc = self.load_stored(target).await?;
                doc.push_top_level(note)?;
                self.storage.save_document(target, doc.notes()).await?;
            }
        }

        match (is_active(source), &active) {
            (true, Some(doc)) => {
                doc.write().detach(note_id)?;
                self.scheduler.save_now(doc).await?;
            }
            _ => {
                let mut doc = self.load_stored(source).await?;
                doc.detach(note_id)?;
                self.storage.save_document(source, doc.notes()).await?;
            }
        }
        info!("[unarchive] Moved {} from '{}' to '{}'", note_id, source, target);
        Ok(())
    }

    async fn load_stored(&self, name: &str) -> Result<Document> {
        let notes = self.storage.load_document(name).await?.unwrap_or_default();
        Ok(Document::new(name, notes))
    }
}

fn check_archived(doc: &Document, note_id: &str) -> Result<()> {
    let note = doc.get(note_id).ok_or_else(|| UninoteError::not_found(note_id))?;
    if !note.is_archived {
        return Err(UninoteError::validation("The note is not archived"));
    }
    Ok(())
}
