mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordingSink, RecordingStorage, contents, fresh, note, with_notes};
use uninote::{AppData, Document, DocumentRecord, DuplicateMode, Engine, NoteStatus, UninoteError};

#[tokio::test(start_paused = true)]
async fn test_first_run_creates_default_document() {
    let (engine, storage, _) = fresh().await;

    let data = storage.stored_app_data().await.unwrap();
    assert_eq!(data.documents, vec!["Main".to_string()]);
    assert_eq!(data.active_document.as_deref(), Some("Main"));
    // The placeholder note exists in memory only
    assert_eq!(storage.stored("Main").await.unwrap().len(), 0);
    assert_eq!(engine.counts().unwrap().top_level, 1);
    assert!(!engine.scheduler().is_initializing());
}

#[tokio::test(start_paused = true)]
async fn test_saves_suppressed_until_bootstrap_finishes() {
    let storage = RecordingStorage::new();
    let sink = RecordingSink::new();
    let engine = Engine::new(common::config(), storage.clone(), sink.clone());
    assert!(engine.scheduler().is_initializing());
    // Nothing is open yet, so there is nothing to flush
    assert!(engine.flush().await.is_ok());

    engine.bootstrap().await.unwrap();
    assert!(!engine.scheduler().is_initializing());
    // Only the explicit first-run write of the empty default document
    assert_eq!(storage.document_saves(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_create_and_persist() {
    let (engine, storage, _) = fresh().await;
    engine.create_document("Test").await.unwrap();
    assert_eq!(engine.session().active_name().as_deref(), Some("Test"));

    let id = engine.document().unwrap().notes()[0].id.clone();
    engine.set_content(&engine.handle(&id).unwrap(), "Hello").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    let stored = storage.stored("Test").await.unwrap();
    assert_eq!(contents(&stored), vec!["Hello"]);

    // A second engine on the same storage sees the same document
    let sink = RecordingSink::new();
    let reloaded = common::start(&storage, &sink).await;
    assert_eq!(reloaded.session().active_name().as_deref(), Some("Test"));
    assert_eq!(contents(reloaded.document().unwrap().notes()), vec!["Hello"]);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_coalesces() {
    let (engine, storage, _) = with_notes(vec![note("a", "start", vec![])]).await;
    let before = storage.document_saves();
    let handle = engine.handle("a").unwrap();

    for i in 0..10 {
        engine.set_content(&handle, &format!("edit {}", i)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(storage.document_saves(), before);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(storage.document_saves(), before + 1);
    let saves = storage.saves_of("Main");
    assert_eq!(contents(saves.last().unwrap()), vec!["edit 9"]);
}

#[tokio::test(start_paused = true)]
async fn test_switch_flushes_pending_edit() {
    let (engine, storage, _) = with_notes(vec![note("a", "start", vec![])]).await;
    engine.set_content(&engine.handle("a").unwrap(), "changed").unwrap();
    assert!(engine.scheduler().has_pending("Main"));

    engine.create_document("Other").await.unwrap();
    assert!(!engine.scheduler().has_pending("Main"));
    assert_eq!(contents(&storage.stored("Main").await.unwrap()), vec!["changed"]);

    engine.switch_document("Main", None).await.unwrap();
    assert_eq!(contents(engine.document().unwrap().notes()), vec!["changed"]);
}

#[tokio::test(start_paused = true)]
async fn test_switch_clears_session_unlocks() {
    let (engine, _, _) = with_notes(vec![note("a", "A", vec![])]).await;
    engine.session().security.unlock_note("a");
    engine.create_document("Other").await.unwrap();
    assert_eq!(engine.session().security.unlocked_note_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_storage_failure_keeps_memory_state() {
    let (engine, storage, sink) = with_notes(vec![note("a", "A", vec![])]).await;
    storage.fail_writes(true);

    let err = engine
        .duplicate(&engine.handle("a").unwrap(), DuplicateMode::Only)
        .await
        .unwrap_err();
    assert!(matches!(err, UninoteError::Storage(_)));
    assert_eq!(sink.errors().len(), 1);
    assert_eq!(engine.document().unwrap().notes().len(), 2);

    storage.fail_writes(false);
    engine.set_content(&engine.handle("a").unwrap(), "A again").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(contents(&storage.stored("Main").await.unwrap()), vec!["A again", "A"]);
}

#[tokio::test(start_paused = true)]
async fn test_background_save_failure_notifies() {
    let (engine, storage, sink) = with_notes(vec![note("a", "A", vec![])]).await;
    storage.fail_writes(true);
    engine.set_content(&engine.handle("a").unwrap(), "lost?").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(sink.errors().len(), 1);
    assert_eq!(engine.find_note("a").unwrap().content, "lost?");
}

#[tokio::test(start_paused = true)]
async fn test_document_registry() {
    let (engine, storage, _) = fresh().await;

    assert!(matches!(engine.create_document("  ").await, Err(UninoteError::Validation(_))));
    assert!(matches!(engine.create_document("Main").await, Err(UninoteError::Validation(_))));

    engine.create_document("Work").await.unwrap();
    assert!(engine.toggle_favorite("Work").await.unwrap());
    engine.set_default_document(Some("Work")).await.unwrap();

    engine.rename_document("Job").await.unwrap();
    let data = engine.app_data();
    assert_eq!(data.documents, vec!["Main".to_string(), "Job".to_string()]);
    assert_eq!(data.favorites, vec!["Job".to_string()]);
    assert_eq!(data.default_document.as_deref(), Some("Job"));
    assert!(storage.stored("Work").await.is_none());
    assert!(storage.stored("Job").await.is_some());

    let listed = engine.list_documents();
    assert!(listed.iter().any(|d| d.name == "Job" && d.is_active && d.is_favorite && d.is_default));

    engine.delete_document("Job").await.unwrap();
    assert_eq!(engine.session().active_name().as_deref(), Some("Main"));
    assert!(matches!(engine.delete_document("Main").await, Err(UninoteError::Validation(_))));
    assert_eq!(storage.stored_app_data().await.unwrap().documents, vec!["Main".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_rename_saves_under_new_name() {
    let (engine, storage, _) = with_notes(vec![note("a", "A", vec![])]).await;
    storage.slow_writes(Duration::from_millis(100));
    let engine = Arc::new(engine);

    let renaming = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.rename_document("Job").await })
    };
    // Lands while the renamed copy is being written
    tokio::time::sleep(Duration::from_millis(150)).await;
    engine.set_content(&engine.handle("a").unwrap(), "mid-rename").unwrap();

    renaming.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(800)).await;

    assert!(storage.stored("Main").await.is_none());
    assert_eq!(contents(&storage.stored("Job").await.unwrap()), vec!["mid-rename"]);
}

#[tokio::test(start_paused = true)]
async fn test_unarchive_into_other_document() {
    let mut archived = note("x", "Old idea", vec![]);
    archived.archive("Main");
    let storage = RecordingStorage::new();
    let mut data = AppData::first_run("Main");
    data.add_document("Ideas");
    storage
        .seed(&data, &[("Main", vec![note("a", "A", vec![]), archived]), ("Ideas", vec![])])
        .await;
    let sink = RecordingSink::new();
    let engine = common::start(&storage, &sink).await;

    engine.unarchive("x", "Main", Some("Ideas")).await.unwrap();

    assert!(!engine.document().unwrap().contains("x"));
    assert_eq!(contents(&storage.stored("Main").await.unwrap()), vec!["A"]);
    let ideas = storage.stored("Ideas").await.unwrap();
    assert_eq!(contents(&ideas), vec!["Old idea"]);
    assert!(!ideas[0].is_archived);
}

#[test]
fn test_document_record_round_trip() {
    let mut deep = note("c", "<b>child</b>", vec![note("d", "grandchild", vec![])]);
    deep.status = NoteStatus::InProgress;
    deep.due_date = Some("2030-05-01T10:00".into());
    deep.is_pinned = true;
    let mut archived = note("e", "gone", vec![]);
    archived.archive("Main");
    let original = Document::new("Main", vec![note("a", "A", vec![deep]), note("b", "B", vec![]), archived]);

    let json = serde_json::to_string(&original.to_record()).unwrap();
    let record: DocumentRecord = serde_json::from_str(&json).unwrap();
    let restored = Document::from_record(record);

    assert_eq!(restored.notes(), original.notes());
    assert_eq!(restored.all_ids(), vec!["a", "c", "d", "b", "e"]);
}

#[tokio::test]
async fn test_engine_is_shareable() {
    let (engine, _, _) = fresh().await;
    let engine = Arc::new(engine);
    let other = engine.clone();
    let id = engine.document().unwrap().notes()[0].id.clone();
    other.set_content(&other.handle(&id).unwrap(), "shared").unwrap();
    assert_eq!(engine.find_note(&id).unwrap().content, "shared");
}
