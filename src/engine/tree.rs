// Tree mutations on an in-memory document
// Each function runs to completion synchronously; a move is a single
// remove+insert on the document so a note can never go missing halfway.

use crate::error::{Result, UninoteError};
use crate::models::{Document, DropZone, DuplicateMode, Note, NoteHandle, NoteStatus};
use crate::session::SecuritySession;

/// Result of a reordering request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(NoteHandle),
    /// Nothing to do (already in place, no parent, no usable sibling)
    Unchanged,
}

impl MoveOutcome {
    pub fn moved(&self) -> bool {
        matches!(self, Self::Moved(_))
    }
}

pub(crate) fn ensure_unlocked(security: &SecuritySession, note: &Note) -> Result<()> {
    if security.is_locked(note) {
        return Err(UninoteError::validation("Note is locked"));
    }
    Ok(())
}

// ============================================
// INSERT / DELETE
// ============================================

/// New empty note right after `after`, in the same list
pub fn insert_sibling(doc: &mut Document, after: &NoteHandle) -> Result<NoteHandle> {
    doc.revalidate(after)?;
    doc.insert(after.parent_id.as_deref(), after.index + 1, Note::default())
}

/// New empty note appended to `parent`'s children
pub fn insert_child(doc: &mut Document, security: &SecuritySession, parent: &NoteHandle) -> Result<NoteHandle> {
    ensure_unlocked(security, doc.note(parent)?)?;
    doc.insert(Some(&parent.id), usize::MAX, Note::default())
}

pub fn add_top_level(doc: &mut Document) -> Result<NoteHandle> {
    doc.push_top_level(Note::default())
}

/// Remove a note and its subtree. When `keep_one` is set and no active
/// top-level note remains, an empty one is appended.
pub fn delete(doc: &mut Document, handle: &NoteHandle, keep_one: bool) -> Result<Note> {
    doc.revalidate(handle)?;
    let (removed, _, _) = doc.detach(&handle.id)?;
    if keep_one {
        doc.ensure_active_note();
    }
    Ok(removed)
}

// ============================================
// MOVES
// ============================================

/// Drag-and-drop: place `source` before, after or inside `target`
pub fn move_relative(
    doc: &mut Document,
    security: &SecuritySession,
    source: &NoteHandle,
    target: &NoteHandle,
    zone: DropZone,
) -> Result<MoveOutcome> {
    doc.revalidate(source)?;
    doc.revalidate(target)?;
    if source.id == target.id {
        return Ok(MoveOutcome::Unchanged);
    }
    if doc.is_descendant_of(&target.id, &source.id) {
        return Err(UninoteError::validation("A note cannot be dropped inside itself"));
    }
    ensure_unlocked(security, doc.note(target)?)
        .map_err(|_| UninoteError::validation("Cannot drop onto a locked note"))?;

    let (parent, index) = match zone {
        DropZone::Nest => (Some(target.id.clone()), usize::MAX),
        DropZone::Before | DropZone::After => {
            let mut index = target.index;
            if source.parent_id == target.parent_id && source.index < target.index {
                index -= 1;
            }
            if zone == DropZone::After {
                index += 1;
            }
            (target.parent_id.clone(), index)
        }
    };

    if parent == source.parent_id && index == source.index {
        return Ok(MoveOutcome::Unchanged);
    }
    doc.relocate(&source.id, parent.as_deref(), index).map(MoveOutcome::Moved)
}

/// Make the note the last child of its previous visible sibling.
/// Archived siblings are skipped.
pub fn indent(doc: &mut Document, security: &SecuritySession, handle: &NoteHandle) -> Result<MoveOutcome> {
    doc.revalidate(handle)?;
    let siblings = doc
        .siblings(handle.parent_id.as_deref())
        .ok_or_else(|| UninoteError::not_found(&handle.id))?;
    let Some(previous) = siblings[..handle.index].iter().rev().find(|n| !n.is_archived) else {
        return Ok(MoveOutcome::Unchanged);
    };
    if security.is_locked(previous) {
        return Ok(MoveOutcome::Unchanged);
    }
    let previous_id = previous.id.clone();
    doc.relocate(&handle.id, Some(&previous_id), usize::MAX).map(MoveOutcome::Moved)
}

/// Move the note out of its parent, right after the parent
pub fn outdent(doc: &mut Document, handle: &NoteHandle) -> Result<MoveOutcome> {
    doc.revalidate(handle)?;
    let Some(parent_id) = handle.parent_id.as_deref() else {
        return Ok(MoveOutcome::Unchanged);
    };
    let parent = doc.handle(parent_id)?;
    doc.relocate(&handle.id, parent.parent_id.as_deref(), parent.index + 1)
        .map(MoveOutcome::Moved)
}

pub fn move_to_top(doc: &mut Document, handle: &NoteHandle) -> Result<MoveOutcome> {
    doc.revalidate(handle)?;
    if handle.index == 0 {
        return Ok(MoveOutcome::Unchanged);
    }
    doc.relocate(&handle.id, handle.parent_id.as_deref(), 0).map(MoveOutcome::Moved)
}

pub fn move_to_bottom(doc: &mut Document, handle: &NoteHandle) -> Result<MoveOutcome> {
    doc.revalidate(handle)?;
    let len = sibling_count(doc, handle);
    if handle.index + 1 >= len {
        return Ok(MoveOutcome::Unchanged);
    }
    doc.relocate(&handle.id, handle.parent_id.as_deref(), usize::MAX).map(MoveOutcome::Moved)
}

/// Move to a 1-based position among the note's siblings
pub fn move_to_position(doc: &mut Document, handle: &NoteHandle, position: usize) -> Result<MoveOutcome> {
    doc.revalidate(handle)?;
    let len = sibling_count(doc, handle);
    if position < 1 || position > len {
        return Err(UninoteError::validation(format!(
            "Position must be between 1 and {}",
            len
        )));
    }
    if position - 1 == handle.index {
        return Ok(MoveOutcome::Unchanged);
    }
    doc.relocate(&handle.id, handle.parent_id.as_deref(), position - 1)
        .map(MoveOutcome::Moved)
}

fn sibling_count(doc: &Document, handle: &NoteHandle) -> usize {
    doc.siblings(handle.parent_id.as_deref()).map_or(0, |list| list.len())
}

// ============================================
// COPY / STATUS / FLAGS
// ============================================

/// Insert a copy right after the source note
pub fn duplicate(
    doc: &mut Document,
    security: &SecuritySession,
    handle: &NoteHandle,
    mode: DuplicateMode,
) -> Result<NoteHandle> {
    let source = doc.note(handle)?;
    ensure_unlocked(security, source)?;
    let copy = match mode {
        DuplicateMode::Only => source.duplicate_shallow(),
        DuplicateMode::WithChildren => source.duplicate_deep(),
    };
    doc.insert(handle.parent_id.as_deref(), handle.index + 1, copy)
}

/// Advance the status and, on reaching done, complete finished parents.
/// Returns the new status and the ids of ancestors completed on the way.
pub fn cycle_status(
    doc: &mut Document,
    security: &SecuritySession,
    handle: &NoteHandle,
) -> Result<(NoteStatus, Vec<String>)> {
    ensure_unlocked(security, doc.note(handle)?)?;
    let note = doc.note_mut(handle)?;
    note.status = note.status.next();
    let status = note.status;
    let completed = if status.is_done() {
        check_parent_status(doc, security, &handle.id)
    } else {
        Vec::new()
    };
    Ok((status, completed))
}

/// Walk upwards from `child_id`: a parent whose active children are all done
/// (locked ones count as done) becomes done too. Never reverts anything.
pub fn check_parent_status(doc: &mut Document, security: &SecuritySession, child_id: &str) -> Vec<String> {
    let mut completed = Vec::new();
    let mut current = child_id.to_string();

    while let Some(parent_id) = doc.parent_id(&current).map(str::to_string) {
        let Some(parent) = doc.get(&parent_id) else {
            break;
        };
        if security.is_locked(parent) {
            break;
        }
        let mut active = parent.children.iter().filter(|c| !c.is_archived).peekable();
        if active.peek().is_none() {
            break;
        }
        let all_done = active.all(|c| c.status.is_done() || security.is_locked(c));
        if !all_done {
            break;
        }
        if let Some(parent) = doc.get_mut(&parent_id) {
            if !parent.status.is_done() {
                parent.status = NoteStatus::Done;
                completed.push(parent_id.clone());
            }
        }
        current = parent_id;
    }
    completed
}

pub fn toggle_pin(doc: &mut Document, handle: &NoteHandle) -> Result<bool> {
    let note = doc.note_mut(handle)?;
    note.is_pinned = !note.is_pinned;
    Ok(note.is_pinned)
}

pub fn toggle_collapse(doc: &mut Document, handle: &NoteHandle) -> Result<bool> {
    let note = doc.note_mut(handle)?;
    note.is_collapsed = !note.is_collapsed;
    Ok(note.is_collapsed)
}

/// Flag a note archived. Returns true when no active top-level note is left.
pub fn archive(doc: &mut Document, handle: &NoteHandle) -> Result<bool> {
    let name = doc.name().to_string();
    doc.note_mut(handle)?.archive(&name);
    Ok(doc.active_top_level_count() == 0)
}
