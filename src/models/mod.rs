// Models module for the Uninote engine
// All persisted fields use camelCase on the wire

pub mod app_data;
pub mod buttons;
pub mod common;
pub mod config;
pub mod document;
pub mod note;
pub mod password;

pub use app_data::AppData;
pub use buttons::{ButtonConfig, NoteButton, Numbering, Preset};
pub use common::{DropZone, DuplicateMode, LockType, NoteStatus};
pub use config::{EngineConfig, EngineConfigOverride, StorageKind};
pub use document::{Document, DocumentRecord, NoteHandle};
pub use note::Note;
pub use password::PasswordHash;
