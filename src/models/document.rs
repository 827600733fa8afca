// Document model: a named, ordered forest of notes
// Keeps a flat id index (path from the roots plus parent id) rebuilt on every
// structural change, and a generation counter that stamps note handles.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::note::Note;
use crate::error::{Result, UninoteError};

/// Persisted document record: `{ name, notes }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub name: String,
    pub notes: Vec<Note>,
}

/// Location of a note, valid for the document generation it was taken from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteHandle {
    pub id: String,
    pub parent_id: Option<String>,
    pub index: usize,
    generation: u64,
}

impl NoteHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    path: Vec<usize>,
    parent_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    notes: Vec<Note>,
    generation: u64,
    index: HashMap<String, IndexEntry>,
    sealed: bool,
}

impl Document {
    pub fn new(name: impl Into<String>, mut notes: Vec<Note>) -> Self {
        for note in &mut notes {
            note.normalize_lock();
        }
        let mut doc = Self {
            name: name.into(),
            notes,
            generation: 0,
            index: HashMap::new(),
            sealed: false,
        };
        doc.reindex();
        doc
    }

    pub fn from_record(record: DocumentRecord) -> Self {
        Self::new(record.name, record.notes)
    }

    /// Placeholder for a password-protected document whose notes are not loaded
    pub fn sealed(name: impl Into<String>) -> Self {
        let mut doc = Self::new(name, Vec::new());
        doc.sealed = true;
        doc
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn to_record(&self) -> DocumentRecord {
        DocumentRecord {
            name: self.name.clone(),
            notes: self.notes.clone(),
        }
    }

    // ============================================
    // INDEX
    // ============================================

    fn reindex(&mut self) {
        fn walk(
            notes: &[Note],
            parent_id: Option<&str>,
            path: &mut Vec<usize>,
            index: &mut HashMap<String, IndexEntry>,
        ) {
            for (i, note) in notes.iter().enumerate() {
                path.push(i);
                index.insert(
                    note.id.clone(),
                    IndexEntry {
                        path: path.clone(),
                        parent_id: parent_id.map(str::to_string),
                    },
                );
                walk(&note.children, Some(&note.id), path, index);
                path.pop();
            }
        }

        let mut index = HashMap::with_capacity(self.index.len());
        walk(&self.notes, None, &mut Vec::new(), &mut index);
        self.index = index;
    }

    /// Record a structural change: new generation, fresh index
    fn touch(&mut self) {
        self.generation += 1;
        self.reindex();
    }

    fn list_at(&self, path: &[usize]) -> Option<&Vec<Note>> {
        let mut list = &self.notes;
        for &i in path {
            list = &list.get(i)?.children;
        }
        Some(list)
    }

    fn list_at_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Note>> {
        let mut list = &mut self.notes;
        for &i in path {
            list = &mut list.get_mut(i)?.children;
        }
        Some(list)
    }

    fn child_list_path(&self, parent_id: Option<&str>) -> Option<Vec<usize>> {
        match parent_id {
            None => Some(Vec::new()),
            Some(id) => self.index.get(id).map(|entry| entry.path.clone()),
        }
    }

    // ============================================
    // LOOKUP
    // ============================================

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn find_by_id(&self, id: &str) -> Option<NoteHandle> {
        let entry = self.index.get(id)?;
        let index = *entry.path.last()?;
        Some(NoteHandle {
            id: id.to_string(),
            parent_id: entry.parent_id.clone(),
            index,
            generation: self.generation,
        })
    }

    pub fn handle(&self, id: &str) -> Result<NoteHandle> {
        self.find_by_id(id).ok_or_else(|| UninoteError::not_found(id))
    }

    /// Check a handle still describes the current tree
    pub fn revalidate(&self, handle: &NoteHandle) -> Result<()> {
        if !self.contains(&handle.id) {
            return Err(UninoteError::not_found(&handle.id));
        }
        if handle.generation != self.generation {
            return Err(UninoteError::StaleHandle(handle.id.clone()));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        let path = &self.index.get(id)?.path;
        let (last, parent) = path.split_last()?;
        self.list_at(parent)?.get(*last)
    }

    /// Mutable access for in-place edits. Callers must not restructure children.
    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Note> {
        let path = self.index.get(id)?.path.clone();
        let (last, parent) = path.split_last()?;
        self.list_at_mut(parent)?.get_mut(*last)
    }

    pub fn note(&self, handle: &NoteHandle) -> Result<&Note> {
        self.revalidate(handle)?;
        self.get(&handle.id).ok_or_else(|| UninoteError::not_found(&handle.id))
    }

    pub(crate) fn note_mut(&mut self, handle: &NoteHandle) -> Result<&mut Note> {
        self.revalidate(handle)?;
        self.get_mut(&handle.id).ok_or_else(|| UninoteError::not_found(&handle.id))
    }

    pub fn parent_id(&self, id: &str) -> Option<&str> {
        self.index.get(id)?.parent_id.as_deref()
    }

    /// Ancestor ids, nearest first
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = self.parent_id(id);
        while let Some(parent) = current {
            out.push(parent.to_string());
            current = self.parent_id(parent);
        }
        out
    }

    /// True when `id` sits somewhere inside the subtree of `ancestor`
    pub fn is_descendant_of(&self, id: &str, ancestor: &str) -> bool {
        match (self.index.get(id), self.index.get(ancestor)) {
            (Some(node), Some(anc)) => {
                node.path.len() > anc.path.len() && node.path.starts_with(&anc.path)
            }
            _ => false,
        }
    }

    /// Sibling list a note belongs to, or the roots for `None`
    pub fn siblings(&self, parent_id: Option<&str>) -> Option<&[Note]> {
        let path = self.child_list_path(parent_id)?;
        self.list_at(&path).map(Vec::as_slice)
    }

    /// Depth-first order comparison of two notes
    pub fn compare_position(&self, a: &str, b: &str) -> Ordering {
        match (self.index.get(a), self.index.get(b)) {
            (Some(x), Some(y)) => x.path.cmp(&y.path),
            _ => Ordering::Equal,
        }
    }

    /// True when the note or any of its ancestors is archived
    pub fn is_in_archived_subtree(&self, id: &str) -> bool {
        std::iter::once(id.to_string())
            .chain(self.ancestors(id))
            .any(|nid| self.get(&nid).is_some_and(|n| n.is_archived))
    }

    // ============================================
    // STRUCTURAL CHANGES
    // ============================================

    /// Insert a note into a child list, clamping the index to the list length
    pub(crate) fn insert(&mut self, parent_id: Option<&str>, index: usize, note: Note) -> Result<NoteHandle> {
        let path = self
            .child_list_path(parent_id)
            .ok_or_else(|| UninoteError::not_found(parent_id.unwrap_or_default()))?;
        let id = note.id.clone();
        let list = self
            .list_at_mut(&path)
            .ok_or_else(|| UninoteError::not_found(parent_id.unwrap_or_default()))?;
        let index = index.min(list.len());
        list.insert(index, note);
        self.touch();
        self.handle(&id)
    }

    pub(crate) fn push_top_level(&mut self, note: Note) -> Result<NoteHandle> {
        let len = self.notes.len();
        self.insert(None, len, note)
    }

    /// Remove a note (with its subtree) and return it with its old position
    pub(crate) fn detach(&mut self, id: &str) -> Result<(Note, Option<String>, usize)> {
        let entry = self.index.get(id).cloned().ok_or_else(|| UninoteError::not_found(id))?;
        let (last, parent) = entry
            .path
            .split_last()
            .ok_or_else(|| UninoteError::not_found(id))?;
        let list = self.list_at_mut(parent).ok_or_else(|| UninoteError::not_found(id))?;
        let note = list.remove(*last);
        self.touch();
        Ok((note, entry.parent_id, *last))
    }

    /// Move a note under `parent_id` at `index`, where the index is read
    /// against the destination list after the note has been removed.
    /// Remove and insert happen back to back, or not at all.
    pub(crate) fn relocate(&mut self, id: &str, parent_id: Option<&str>, index: usize) -> Result<NoteHandle> {
        if !self.contains(id) {
            return Err(UninoteError::not_found(id));
        }
        if let Some(parent) = parent_id {
            if !self.contains(parent) {
                return Err(UninoteError::not_found(parent));
            }
            if parent == id || self.is_descendant_of(parent, id) {
                return Err(UninoteError::validation("A note cannot be moved inside itself"));
            }
        }

        let (note, old_parent, old_index) = self.detach(id)?;
        let target = self
            .child_list_path(parent_id)
            .filter(|path| self.list_at(path).is_some());
        let restoring = target.is_none();
        let (path, at) = match target {
            Some(path) => (path, index),
            None => (
                self.child_list_path(old_parent.as_deref()).unwrap_or_default(),
                old_index,
            ),
        };
        if let Some(list) = self.list_at_mut(&path) {
            let at = at.min(list.len());
            list.insert(at, note);
        }
        self.touch();
        if restoring {
            return Err(UninoteError::not_found(parent_id.unwrap_or_default()));
        }
        self.handle(id)
    }

    /// Append an empty note when no active top-level note is left.
    /// Returns the id of the inserted note.
    pub(crate) fn ensure_active_note(&mut self) -> Option<String> {
        if self.sealed || self.active_top_level_count() > 0 {
            return None;
        }
        let note = Note::default();
        let id = note.id.clone();
        self.notes.push(note);
        self.touch();
        Some(id)
    }

    // ============================================
    // COUNTS AND ORDERING
    // ============================================

    pub fn active_top_level_count(&self) -> usize {
        self.notes.iter().filter(|n| !n.is_archived).count()
    }

    /// Active notes at any depth; archived notes hide their whole subtree
    pub fn active_count(&self) -> usize {
        fn count(notes: &[Note]) -> usize {
            notes
                .iter()
                .filter(|n| !n.is_archived)
                .map(|n| 1 + count(&n.children))
                .sum()
        }
        count(&self.notes)
    }

    /// Every note in the forest, archived or not
    pub fn total_count(&self) -> usize {
        self.index.len()
    }

    pub fn all_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(self.index.len());
        for note in &self.notes {
            note.collect_ids(&mut ids);
        }
        ids
    }

    /// Non-archived notes of a list with pinned notes first, storage order otherwise kept
    pub fn display_order(notes: &[Note]) -> Vec<&Note> {
        let mut visible: Vec<&Note> = notes.iter().filter(|n| !n.is_archived).collect();
        visible.sort_by_key(|n| !n.is_pinned);
        visible
    }
}
