// Common types shared by notes, documents and app data
// Wire names match the persisted JSON written by earlier versions

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current time as an ISO-8601 UTC string with millisecond precision
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generate new UUID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Note status, cycled explicitly by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    #[default]
    Todo,
    #[serde(rename = "inprogress", alias = "in-progress")]
    InProgress,
    Done,
}

impl NoteStatus {
    /// todo -> inprogress -> done -> todo
    pub fn next(self) -> Self {
        match self {
            Self::Todo => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::Todo,
        }
    }

    pub fn is_done(self) -> bool {
        self == Self::Done
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "inprogress",
            Self::Done => "done",
        }
    }
}

/// Scope of the password protecting a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    /// Shares the app-wide universal password
    Universal,
    /// Shares the password of the document holding the note
    Document,
    /// Note-specific password
    Exclusive,
}

/// Where a dragged note lands relative to the drop target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropZone {
    Before,
    After,
    Nest,
}

impl DropZone {
    /// Top third of the target box drops before, bottom third after,
    /// the middle third nests the dragged note as a child.
    pub fn from_pointer(pointer_y: f64, top: f64, height: f64) -> Self {
        let offset = pointer_y - top;
        if offset < height / 3.0 {
            Self::Before
        } else if offset > height * 2.0 / 3.0 {
            Self::After
        } else {
            Self::Nest
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateMode {
    Only,
    WithChildren,
}


#[cfg(test)]
mod id_time_tests {
    use super::*;

    #[test]
    fn test_now_iso_shape() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_new_id_is_unique() {
        assert_ne!(new_id(), new_id());
        assert!(Uuid::parse_str(&new_id()).is_ok());
    }
}
