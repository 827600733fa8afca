// Single-note operations on the active document
// Structural edits go through engine::tree; this layer picks the save policy

use serde::Serialize;
use tracing::debug;

use super::reminders::parse_due;
use super::tree::{self, MoveOutcome, ensure_unlocked};
use super::Engine;
use crate::error::{Result, UninoteError};
use crate::models::{Document, DropZone, DuplicateMode, Note, NoteHandle, NoteStatus};
use crate::notify::NoticeLevel;

/// Counters shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCounts {
    pub top_level: usize,
    pub total: usize,
}

impl Engine {
    // ============================================
    // LOOKUP
    // ============================================

    /// Resolve an id against the current tree
    pub fn handle(&self, id: &str) -> Result<NoteHandle> {
        let result = self.with_document(|doc| doc.handle(id)).and_then(|r| r);
        self.report("handle", result)
    }

    pub fn find_note(&self, id: &str) -> Option<Note> {
        self.with_document(|doc| doc.get(id).cloned()).ok().flatten()
    }

    /// Notes of one list in render order: archived hidden, pinned first
    pub fn display_order(&self, parent_id: Option<&str>) -> Result<Vec<Note>> {
        self.with_document(|doc| {
            doc.siblings(parent_id)
                .map(|list| Document::display_order(list).into_iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    pub fn counts(&self) -> Result<NoteCounts> {
        self.with_document(|doc| NoteCounts {
            top_level: doc.active_top_level_count(),
            total: doc.active_count(),
        })
    }

    // ============================================
    // INSERT / DELETE
    // ============================================

    pub fn add_top_level_note(&self) -> Result<NoteHandle> {
        let result = self.edit(|doc, _| tree::add_top_level(doc));
        self.report("add_top_level_note", result)
    }

    pub fn insert_sibling(&self, after: &NoteHandle) -> Result<NoteHandle> {
        let result = self.edit(|doc, _| tree::insert_sibling(doc, after));
        self.report("insert_sibling", result)
    }

    /// Append an empty child and expand the parent so it shows
    pub fn insert_child(&self, parent: &NoteHandle) -> Result<NoteHandle> {
        let result = self.edit(|doc, security| {
            let child = tree::insert_child(doc, security, parent)?;
            if let Some(note) = doc.get_mut(&parent.id) {
                note.is_collapsed = false;
            }
            Ok(child)
        });
        self.report("insert_child", result)
    }

    /// Delete a note and its subtree. Locked notes need `confirmed`.
    pub fn delete_note(&self, handle: &NoteHandle, confirmed: bool) -> Result<Note> {
        let keep_one = !self.session.archive_view_active();
        let result = self.edit(|doc, security| {
            if doc.note(handle)?.is_lock_protected() && !confirmed {
                return Err(UninoteError::validation("Deleting a locked note must be confirmed"));
            }
            let removed = tree::delete(doc, handle, keep_one)?;
            security.relock_note(&removed.id);
            Ok(removed)
        });
        if let Ok(removed) = &result {
            debug!("[delete_note] Removed {} ({} notes)", removed.id, removed.subtree_size());
        }
        self.report("delete_note", result)
    }

    // ============================================
    // MOVES
    // ============================================

    /// Drag-and-drop release. `None` means dropped on empty space.
    pub async fn move_note(&self, source: &NoteHandle, drop: Option<(&NoteHandle, DropZone)>) -> Result<MoveOutcome> {
        let Some((target, zone)) = drop else {
            return Ok(MoveOutcome::Unchanged);
        };
        let result = self
            .edit_now(|doc, security| tree::move_relative(doc, security, source, target, zone))
            .await;
        self.report("move_note", result)
    }

    pub fn indent(&self, handle: &NoteHandle) -> Result<MoveOutcome> {
        let result = self.edit(|doc, security| tree::indent(doc, security, handle));
        self.report("indent", result)
    }

    pub fn outdent(&self, handle: &NoteHandle) -> Result<MoveOutcome> {
        let result = self.edit(|doc, _| tree::outdent(doc, handle));
        self.report("outdent", result)
    }

    /// Explicit one-level outdent that tells the user when there is nowhere to go
    pub fn promote(&self, handle: &NoteHandle) -> Result<MoveOutcome> {
        let outcome = self.outdent(handle)?;
        if !outcome.moved() {
            self.inform(NoticeLevel::Info, "The note is already at the top level");
        }
        Ok(outcome)
    }

    pub fn move_to_top(&self, handle: &NoteHandle) -> Result<MoveOutcome> {
        let result = self.edit(|doc, _| tree::move_to_top(doc, handle));
        self.report("move_to_top", result)
    }

    pub fn move_to_bottom(&self, handle: &NoteHandle) -> Result<MoveOutcome> {
        let result = self.edit(|doc, _| tree::move_to_bottom(doc, handle));
        self.report("move_to_bottom", result)
    }

    /// Move among siblings to a 1-based position
    pub fn move_to_position(&self, handle: &NoteHandle, position: usize) -> Result<MoveOutcome> {
        let result = self.edit(|doc, _| tree::move_to_position(doc, handle, position));
        let outcome = self.report("move_to_position", result)?;
        if !outcome.moved() {
            self.inform(
                NoticeLevel::Info,
                &format!("The note is already at position {}", position),
            );
        }
        Ok(outcome)
    }

    // ============================================
    // COPY / STATUS / FLAGS
    // ============================================

    pub async fn duplicate(&self, handle: &NoteHandle, mode: DuplicateMode) -> Result<NoteHandle> {
        let result = self
            .edit_now(|doc, security| tree::duplicate(doc, security, handle, mode))
            .await;
        self.report("duplicate", result)
    }

    /// Advance the status; returns the new status and any ancestors completed by it
    pub async fn cycle_status(&self, handle: &NoteHandle) -> Result<(NoteStatus, Vec<String>)> {
        let result = self
            .edit_now(|doc, security| tree::cycle_status(doc, security, handle))
            .await;
        self.report("cycle_status", result)
    }

    pub fn toggle_pin(&self, handle: &NoteHandle) -> Result<bool> {
        let result = self.edit(|doc, _| tree::toggle_pin(doc, handle));
        self.report("toggle_pin", result)
    }

    pub async fn toggle_collapse(&self, handle: &NoteHandle) -> Result<bool> {
        let result = self.edit_now(|doc, _| tree::toggle_collapse(doc, handle)).await;
        self.report("toggle_collapse", result)
    }

    // ============================================
    // FIELDS
    // ============================================

    pub fn set_content(&self, handle: &NoteHandle, content: &str) -> Result<()> {
        let result = self.edit(|doc, security| {
            let note = doc.note_mut(handle)?;
            ensure_unlocked(security, note)?;
            note.content = content.to_string();
            Ok(())
        });
        self.report("set_content", result)
    }

    /// Set the icon and remember it among the recent icons
    pub async fn set_icon(&self, handle: &NoteHandle, icon: &str) -> Result<()> {
        let icon = icon.trim();
        if icon.is_empty() {
            return self.clear_icon(handle);
        }
        let result = self.edit(|doc, security| {
            let note = doc.note_mut(handle)?;
            ensure_unlocked(security, note)?;
            note.icon = icon.to_string();
            Ok(())
        });
        self.report("set_icon", result)?;
        self.add_recent_icon(icon).await;
        Ok(())
    }

    pub fn clear_icon(&self, handle: &NoteHandle) -> Result<()> {
        let result = self.edit(|doc, security| {
            let note = doc.note_mut(handle)?;
            ensure_unlocked(security, note)?;
            note.icon.clear();
            Ok(())
        });
        self.report("clear_icon", result)
    }

    pub fn set_due_date(&self, handle: &NoteHandle, due: &str) -> Result<()> {
        let result = parse_due(due)
            .ok_or_else(|| UninoteError::validation(format!("Invalid due date: {}", due)))
            .and_then(|_| {
                self.edit(|doc, security| {
                    let note = doc.note_mut(handle)?;
                    ensure_unlocked(security, note)?;
                    note.due_date = Some(due.trim().to_string());
                    Ok(())
                })
            });
        self.report("set_due_date", result)
    }

    pub fn clear_due_date(&self, handle: &NoteHandle) -> Result<()> {
        let result = self.edit(|doc, security| {
            let note = doc.note_mut(handle)?;
            ensure_unlocked(security, note)?;
            note.due_date = None;
            Ok(())
        });
        self.report("clear_due_date", result)
    }

    // ============================================
    // VIEW
    // ============================================

    /// Switch between the active tree and the archive view. Leaving the
    /// archive view restores the one-active-note invariant.
    pub fn set_archive_view(&self, active: bool) -> Result<()> {
        if !active {
            self.ensure_app_unlocked()?;
        }
        self.session.ui.write().archive_view_active = active;
        if active {
            return Ok(());
        }
        let doc = self.active()?;
        if doc.read().is_sealed() {
            return Ok(());
        }
        let inserted = doc.write().ensure_active_note();
        if inserted.is_some() {
            self.scheduler.schedule(&doc);
        }
        Ok(())
    }
}
