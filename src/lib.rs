// Uninote: hierarchical note documents with debounced persistence and
// password-locked notes. A UI layer drives everything through `Engine`.

pub mod crypto;
pub mod engine;
pub mod error;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod session;
pub mod storage;

use std::path::Path;
use std::sync::Arc;

use tracing::Level;

pub use engine::Engine;
pub use engine::MoveOutcome;
pub use engine::archive::{ArchiveSort, ArchivedNote};
pub use engine::documents::DocumentInfo;
pub use engine::notes::NoteCounts;
pub use engine::reminders::{DueAlert, DueReminder, DueReport, DueState};
pub use engine::search::SearchHit;
pub use engine::security::{LockRequest, SecretScope};
pub use engine::transfer::{Backup, BackupMode, DocumentExport, ImportMode, ImportSummary};
pub use error::{Result, StorageError, UninoteError};
pub use models::{
    AppData, ButtonConfig, Document, DocumentRecord, DropZone, DuplicateMode, EngineConfig, EngineConfigOverride,
    LockType, Note, NoteButton, NoteHandle, NoteStatus, Numbering, PasswordHash, Preset, StorageKind,
};
pub use notify::{NoticeLevel, NotificationSink, TracingNotifier};
pub use storage::{FileStorage, MemoryStorage, StorageGateway, StorageState};

/// Install the fmt subscriber. Unknown levels fall back to info; a second
/// call leaves the first subscriber in place.
pub fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Read `config.md` from `config_path` (or the global location), set up
/// logging and storage, then start the engine with the tracing notifier.
pub async fn launch(config_path: Option<&Path>) -> Result<Engine> {
    let config = match config_path.map(Path::to_path_buf).or_else(storage::global_config_path) {
        Some(path) => storage::load_config(&path),
        None => EngineConfig::default(),
    };
    init_logging(&config.log_level);
    let storage = storage::open_storage(&config).await;
    Engine::start(config, storage, Arc::new(TracingNotifier)).await
}
