// Operations on a multi-note selection
// Selections run in reverse document order so earlier moves never shift later targets

use std::collections::BTreeSet;

use tracing::debug;

use super::Engine;
use super::tree;
use crate::error::{Result, UninoteError};
use crate::models::Document;
use crate::notify::NoticeLevel;

/// Known ids of the selection, deduplicated, last in document order first
fn reverse_document_order(doc: &Document, ids: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = ids
        .iter()
        .filter(|id| doc.contains(id))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    selected.sort_by(|a, b| doc.compare_position(b, a));
    selected
}

impl Engine {
    /// Delete every selected note. Locked notes are included once confirmed.
    pub fn bulk_delete(&self, ids: &[String], confirmed: bool) -> Result<usize> {
        let keep_one = !self.session.archive_view_active();
        let result = self.edit(|doc, security| {
            let ordered = reverse_document_order(doc, ids);
            let has_locked = ordered
                .iter()
                .any(|id| doc.get(id).is_some_and(|n| n.is_lock_protected()));
            if has_locked && !confirmed {
                return Err(UninoteError::validation("Deleting locked notes must be confirmed"));
            }
            let mut removed = 0;
            for id in ordered {
                // Already gone with a selected ancestor
                if !doc.contains(&id) {
                    continue;
                }
                let (note, _, _) = doc.detach(&id)?;
                security.relock_note(&note.id);
                removed += 1;
            }
            if keep_one {
                doc.ensure_active_note();
            }
            Ok(removed)
        });
        let removed = self.report("bulk_delete", result)?;
        if removed > 0 {
            self.inform(NoticeLevel::Success, &format!("{} notes deleted", removed));
        }
        Ok(removed)
    }

    /// Indent each selected note; locked notes stay where they are
    pub fn bulk_indent(&self, ids: &[String]) -> Result<usize> {
        let result = self.edit(|doc, security| {
            let mut moved = 0;
            for id in reverse_document_order(doc, ids) {
                let handle = doc.handle(&id)?;
                if security.is_locked(doc.note(&handle)?) {
                    continue;
                }
                if tree::indent(doc, security, &handle)?.moved() {
                    moved += 1;
                }
            }
            Ok(moved)
        });
        self.report("bulk_indent", result)
    }

    pub fn bulk_outdent(&self, ids: &[String]) -> Result<usize> {
        let result = self.edit(|doc, security| {
            let mut moved = 0;
            for id in reverse_document_order(doc, ids) {
                let handle = doc.handle(&id)?;
                if security.is_locked(doc.note(&handle)?) {
                    continue;
                }
                if tree::outdent(doc, &handle)?.moved() {
                    moved += 1;
                }
            }
            Ok(moved)
        });
        self.report("bulk_outdent", result)
    }

    /// Archive the selection. Returns true when the archive view was switched on.
    pub fn bulk_archive(&self, ids: &[String]) -> Result<bool> {
        let result = self.edit(|doc, security| {
            let mut emptied = false;
            for id in reverse_document_order(doc, ids) {
                let handle = doc.handle(&id)?;
                if security.is_locked(doc.note(&handle)?) {
                    continue;
                }
                emptied = tree::archive(doc, &handle)?;
            }
            Ok(emptied)
        });
        let emptied = self.report("bulk_archive", result)?;
        if emptied {
            self.session.ui.write().archive_view_active = true;
            self.inform(NoticeLevel::Info, "All notes are archived, showing the archive");
        }
        Ok(emptied)
    }

    /// Extend a selection with every descendant of its notes
    pub fn select_descendants(&self, ids: &[String]) -> Result<Vec<String>> {
        self.with_document(|doc| {
            let mut selected: Vec<String> = ids.iter().filter(|id| doc.contains(id)).cloned().collect();
            let mut seen: BTreeSet<String> = selected.iter().cloned().collect();
            for id in ids {
                let Some(note) = doc.get(id) else {
                    continue;
                };
                let mut descendants = Vec::new();
                for child in &note.children {
                    child.collect_ids(&mut descendants);
                }
                for descendant in descendants {
                    if seen.insert(descendant.clone()) {
                        selected.push(descendant);
                    }
                }
            }
            debug!("[select_descendants] {} -> {} notes", ids.len(), selected.len());
            selected
        })
    }
}
