// Note model: one node of a document's note forest
// Field names follow the persisted camelCase JSON

use serde::{Deserialize, Serialize};

use super::password::PasswordHash;
use super::common::{LockType, NoteStatus, new_id, now_iso};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: NoteStatus,
    #[serde(default)]
    pub creation_date: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub children: Vec<Note>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub archived_timestamp: Option<String>,
    #[serde(default, rename = "originalDoc", alias = "originalDocument")]
    pub original_document: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_collapsed: bool,
    #[serde(default)]
    pub lock_type: Option<LockType>,
    #[serde(default)]
    pub lock_hint: String,
    #[serde(default)]
    pub password_hash: Option<PasswordHash>,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            id: new_id(),
            content: String::new(),
            status: NoteStatus::Todo,
            creation_date: now_iso(),
            due_date: None,
            icon: String::new(),
            children: Vec::new(),
            is_archived: false,
            archived_timestamp: None,
            original_document: None,
            is_pinned: false,
            is_collapsed: false,
            lock_type: None,
            lock_hint: String::new(),
            password_hash: None,
        }
    }
}

impl Note {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Lock-protected means a lock type backed by a stored hash
    pub fn is_lock_protected(&self) -> bool {
        self.lock_type.is_some() && self.password_hash.is_some()
    }

    pub fn set_lock(&mut self, lock_type: LockType, hash: PasswordHash, hint: String) {
        self.lock_type = Some(lock_type);
        self.password_hash = Some(hash);
        self.lock_hint = hint;
    }

    pub fn clear_lock(&mut self) {
        self.lock_type = None;
        self.password_hash = None;
        self.lock_hint.clear();
    }

    pub fn archive(&mut self, document_name: &str) {
        self.is_archived = true;
        self.archived_timestamp = Some(now_iso());
        self.original_document = Some(document_name.to_string());
    }

    pub fn unarchive(&mut self) {
        self.is_archived = false;
        self.archived_timestamp = None;
        self.original_document = None;
    }

    /// Copy of content, status, icon and due date under a fresh id
    pub fn duplicate_shallow(&self) -> Self {
        Self {
            content: self.content.clone(),
            status: self.status,
            icon: self.icon.clone(),
            due_date: self.due_date.clone(),
            ..Self::default()
        }
    }

    /// Deep copy where every node gets a new id and creation date.
    /// Lock state is never carried over.
    pub fn duplicate_deep(&self) -> Self {
        let mut clone = self.clone();
        clone.refresh_identity();
        clone
    }

    fn refresh_identity(&mut self) {
        self.id = new_id();
        self.creation_date = now_iso();
        self.clear_lock();
        for child in &mut self.children {
            child.refresh_identity();
        }
    }

    /// Ids of this note and all of its descendants, depth first
    pub fn collect_ids(&self, out: &mut Vec<String>) {
        out.push(self.id.clone());
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    /// Total node count of this subtree including the note itself
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(Note::subtree_size).sum::<usize>()
    }

    /// Drop a lock type that has no hash behind it
    pub(crate) fn normalize_lock(&mut self) {
        if self.lock_type.is_some() && self.password_hash.is_none() {
            self.lock_type = None;
        }
        for child in &mut self.children {
            child.normalize_lock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked_tree() -> Note {
        let mut root = Note::new("root");
        root.set_lock(LockType::Exclusive, PasswordHash::Legacy("aa".into()), "hint".into());
        let mut child = Note::new("child");
        child.set_lock(LockType::Universal, PasswordHash::Legacy("bb".into()), String::new());
        child.children.push(Note::new("grandchild"));
        root.children.push(child);
        root
    }

    #[test]
    fn test_new_note_defaults() {
        let note = Note::new("Hello");
        assert_eq!(note.content, "Hello");
        assert_eq!(note.status, NoteStatus::Todo);
        assert!(note.children.is_empty());
        assert!(!note.creation_date.is_empty());
        assert!(!note.is_lock_protected());
    }

    #[test]
    fn test_roundtrip_preserves_tree() {
        let mut root = locked_tree();
        root.due_date = Some("2024-05-01T10:00".into());
        root.archive("Work");
        let json = serde_json::to_string(&root).unwrap();
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(back, root);
        assert!(json.contains("\"originalDoc\":\"Work\""));
    }

    #[test]
    fn test_parses_sparse_record() {
        let note: Note = serde_json::from_str(r#"{"id":"n1","content":"x","status":"done"}"#).unwrap();
        assert_eq!(note.id, "n1");
        assert_eq!(note.status, NoteStatus::Done);
        assert_eq!(note.icon, "");
        assert!(note.due_date.is_none());
    }

    #[test]
    fn test_duplicate_shallow() {
        let mut source = locked_tree();
        source.icon = "🔥".into();
        source.status = NoteStatus::InProgress;
        let copy = source.duplicate_shallow();
        assert_ne!(copy.id, source.id);
        assert_eq!(copy.content, "root");
        assert_eq!(copy.icon, "🔥");
        assert_eq!(copy.status, NoteStatus::InProgress);
        assert!(copy.children.is_empty());
        assert!(copy.lock_type.is_none());
    }

    #[test]
    fn test_duplicate_deep_fresh_ids_and_unlocked() {
        let source = locked_tree();
        let copy = source.duplicate_deep();

        let mut original_ids = Vec::new();
        source.collect_ids(&mut original_ids);
        let mut clone_ids = Vec::new();
        copy.collect_ids(&mut clone_ids);

        assert_eq!(clone_ids.len(), 3);
        assert!(clone_ids.iter().all(|id| !original_ids.contains(id)));
        assert!(copy.lock_type.is_none());
        assert!(copy.children[0].lock_type.is_none());
        assert!(copy.children[0].password_hash.is_none());
        assert_eq!(copy.children[0].children[0].content, "grandchild");
    }

    #[test]
    fn test_normalize_lock_without_hash() {
        let mut note = Note::new("x");
        note.lock_type = Some(LockType::Exclusive);
        note.normalize_lock();
        assert!(note.lock_type.is_none());
    }
}
