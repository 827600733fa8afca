// Search within the active document and across readable documents

use std::collections::HashSet;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use super::common::plain_text;
use super::Engine;
use crate::error::Result;
use crate::models::{Document, Note};
use crate::session::SecuritySession;

/// One match from a search across documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub document_name: String,
    pub note_id: String,
    pub text: String,
}

/// Searchable text: the hint while locked, else the content
fn searchable_text(note: &Note, security: &SecuritySession) -> String {
    if security.is_locked(note) {
        plain_text(&note.lock_hint)
    } else {
        plain_text(&note.content)
    }
}

fn local_matches(doc: &Document, notes: &[Note], security: &SecuritySession, needle: &str, out: &mut HashSet<String>) {
    for note in notes {
        if note.is_archived {
            continue;
        }
        if searchable_text(note, security).to_lowercase().contains(needle) {
            out.insert(note.id.clone());
            out.extend(doc.ancestors(&note.id));
        }
        local_matches(doc, &note.children, security, needle, out);
    }
}

fn global_matches(
    document_name: &str,
    notes: &[Note],
    security: &SecuritySession,
    needle: &str,
    out: &mut Vec<SearchHit>,
) {
    for note in notes {
        if note.is_archived {
            continue;
        }
        let text = searchable_text(note, security);
        if text.to_lowercase().contains(needle) {
            out.push(SearchHit {
                document_name: document_name.to_string(),
                note_id: note.id.clone(),
                text,
            });
        }
        if !security.is_locked(note) {
            global_matches(document_name, &note.children, security, needle, out);
        }
    }
}

impl Engine {
    /// Ids to keep visible for a filter term: matches plus their ancestors,
    /// in document order. `None` for an empty term (nothing filtered).
    pub fn search_local(&self, term: &str) -> Result<Option<Vec<String>>> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        self.with_document(|doc| {
            let mut visible = HashSet::new();
            local_matches(doc, doc.notes(), &self.session.security, &needle, &mut visible);
            let ordered: Vec<String> = doc.all_ids().into_iter().filter(|id| visible.contains(id)).collect();
            debug!("[search_local] '{}' -> {} visible notes", term, ordered.len());
            Some(ordered)
        })
    }

    /// Search every readable document. The active one is read from memory.
    pub async fn search_global(&self, term: &str) -> Result<Vec<SearchHit>> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let security = &self.session.security;
        let active = self
            .session
            .active_document()
            .filter(|doc| !doc.read().is_sealed());
        let active_name = active.as_ref().map(|doc| doc.read().name().to_string());

        let names = self.readable_documents();
        let stored: Vec<&String> = names
            .iter()
            .filter(|name| Some(*name) != active_name.as_ref())
            .collect();
        let mut loaded = join_all(stored.iter().map(|name| self.storage.load_document(name)))
            .await
            .into_iter();

        let mut hits = Vec::new();
        for name in &names {
            if Some(name) == active_name.as_ref() {
                if let Some(doc) = &active {
                    global_matches(name, doc.read().notes(), security, &needle, &mut hits);
                }
                continue;
            }
            match loaded.next() {
                Some(Ok(Some(notes))) => global_matches(name, &notes, security, &needle, &mut hits),
                Some(Ok(None)) | None => {}
                Some(Err(e)) => warn!("[search_global] Skipping '{}': {}", name, e),
            }
        }
        debug!("[search_global] '{}' -> {} hits", term, hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LockType, PasswordHash};

    fn note(id: &str, content: &str, children: Vec<Note>) -> Note {
        Note {
            id: id.to_string(),
            content: content.to_string(),
            children,
            ..Note::default()
        }
    }

    #[test]
    fn test_local_matches_include_ancestors() {
        let doc = Document::new(
            "Doc",
            vec![
                note("a", "Groceries", vec![note("a1", "<b>Milk</b>", vec![])]),
                note("b", "Work", vec![]),
            ],
        );
        let mut out = HashSet::new();
        local_matches(&doc, doc.notes(), &SecuritySession::default(), "milk", &mut out);
        assert_eq!(out, HashSet::from(["a".to_string(), "a1".to_string()]));
    }

    #[test]
    fn test_global_matches_stop_at_locked_notes() {
        let mut locked = note("l", "Secret plan", vec![note("l1", "plan details", vec![])]);
        locked.set_lock(LockType::Exclusive, PasswordHash::Legacy("x".into()), "My plan".into());
        let mut archived = note("z", "old plan", vec![]);
        archived.is_archived = true;

        let security = SecuritySession::default();
        let mut hits = Vec::new();
        global_matches("Doc", &[locked.clone(), archived], &security, "plan", &mut hits);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "My plan");

        security.unlock_note("l");
        hits.clear();
        global_matches("Doc", &[locked], &security, "plan", &mut hits);
        let ids: Vec<_> = hits.iter().map(|h| h.note_id.as_str()).collect();
        assert_eq!(ids, vec!["l", "l1"]);
    }
}
