mod common;

use std::collections::HashSet;

use common::{contents, fresh, note, with_notes};
use uninote::{BackupMode, ImportMode, Note, NoteStatus, NoticeLevel, UninoteError};

fn ids(notes: &[Note]) -> Vec<String> {
    let mut out = Vec::new();
    for n in notes {
        n.collect_ids(&mut out);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn test_export_then_import_as_new_document() {
    let (engine, storage, sink) = with_notes(vec![note("a", "A", vec![note("b", "B", vec![])])]).await;
    engine
        .set_content(&engine.handle("b").unwrap(), "B edited")
        .unwrap();

    let export = engine.export_document().await.unwrap();
    assert_eq!(export.document_name, "Main");
    assert_eq!(export.notes[0].children[0].content, "B edited");
    let json = serde_json::to_string(&export).unwrap();
    assert!(json.contains("\"documentName\":\"Main\""));

    let summary = engine.import_document(&json, ImportMode::NewDocument).await.unwrap();
    assert_eq!(summary.document_name, "Main (Imported)");
    assert_eq!(summary.note_count, 1);
    assert_eq!(engine.session().active_name().as_deref(), Some("Main (Imported)"));
    assert_eq!(ids(engine.document().unwrap().notes()), vec!["a", "b"]);
    assert_eq!(ids(&storage.stored("Main (Imported)").await.unwrap()), vec!["a", "b"]);
    assert_eq!(sink.at(NoticeLevel::Success).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_merge_import_reassigns_colliding_ids() {
    let (engine, storage, _) = with_notes(vec![note("a", "A", vec![note("b", "B", vec![])])]).await;
    let json = serde_json::to_string(&engine.export_document().await.unwrap()).unwrap();

    let summary = engine.import_document(&json, ImportMode::Merge).await.unwrap();
    assert_eq!(summary.document_name, "Main");

    let stored = storage.stored("Main").await.unwrap();
    assert_eq!(contents(&stored), vec!["A", "A"]);
    let all = ids(&stored);
    assert_eq!(all.len(), 4);
    assert_eq!(all.iter().collect::<HashSet<_>>().len(), 4);
    assert_eq!(&all[..2], &["a".to_string(), "b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_import_rejects_foreign_files() {
    let (engine, _, sink) = fresh().await;
    let err = engine
        .import_document(r#"{"title":"x","items":[]}"#, ImportMode::Merge)
        .await
        .unwrap_err();
    assert!(matches!(err, UninoteError::Validation(_)));
    assert_eq!(sink.errors(), vec!["Invalid file: not a Uninote export".to_string()]);
    assert!(engine.import_backup("[]", BackupMode::Merge).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_notion_import_appends_tree() {
    let (engine, _, _) = with_notes(vec![note("a", "A", vec![])]).await;
    let md = "- [x] **Ship** release\n    - [ ] write notes\n- plain item\n";

    let summary = engine.import_notion(md).await.unwrap();
    assert_eq!(summary.note_count, 2);

    let doc = engine.document().unwrap();
    assert_eq!(contents(doc.notes()), vec!["A", "<b>Ship</b> release", "plain item"]);
    assert_eq!(doc.notes()[1].status, NoteStatus::Done);
    assert_eq!(contents(&doc.notes()[1].children), vec!["write notes"]);

    assert!(matches!(engine.import_notion("\n\n").await, Err(UninoteError::Validation(_))));
}

#[tokio::test(start_paused = true)]
async fn test_backup_replace_restores_everything() {
    let (source, _, _) = with_notes(vec![note("a", "A", vec![])]).await;
    source.create_document("Work").await.unwrap();
    let work_note = source.document().unwrap().notes()[0].id.clone();
    source
        .set_content(&source.handle(&work_note).unwrap(), "meeting")
        .unwrap();

    let backup = source.export_backup().await.unwrap();
    assert_eq!(backup.all_notes_data.len(), 2);
    assert_eq!(contents(&backup.all_notes_data["Work"]), vec!["meeting"]);
    let json = serde_json::to_string(&backup).unwrap();
    assert!(json.contains("allNotesData"));

    let (target, storage, _) = fresh().await;
    target.create_document("Scratch").await.unwrap();
    let restored = target.import_backup(&json, BackupMode::Replace).await.unwrap();
    assert_eq!(restored, 2);

    let data = storage.stored_app_data().await.unwrap();
    assert_eq!(data.documents, vec!["Main".to_string(), "Work".to_string()]);
    assert!(storage.stored("Scratch").await.is_none());
    assert_eq!(target.session().active_name().as_deref(), Some("Work"));
    assert_eq!(contents(target.document().unwrap().notes()), vec!["meeting"]);
}

#[tokio::test(start_paused = true)]
async fn test_backup_merge_keeps_current_documents() {
    let (source, _, _) = with_notes(vec![note("a", "from backup", vec![])]).await;
    let json = serde_json::to_string(&source.export_backup().await.unwrap()).unwrap();

    let (target, storage, _) = with_notes(vec![note("a", "local", vec![])]).await;
    assert_eq!(target.import_backup(&json, BackupMode::Merge).await.unwrap(), 1);

    let data = target.app_data();
    assert_eq!(data.documents, vec!["Main".to_string(), "Main (Imported)".to_string()]);
    assert_eq!(contents(&storage.stored("Main").await.unwrap()), vec!["local"]);
    assert_eq!(
        contents(&storage.stored("Main (Imported)").await.unwrap()),
        vec!["from backup"]
    );
    assert_eq!(target.session().active_name().as_deref(), Some("Main"));
}

#[tokio::test(start_paused = true)]
async fn test_sealed_document_cannot_be_exported() {
    let (engine, _, _) = with_notes(vec![note("a", "A", vec![])]).await;
    engine.set_document_password("d", "d").await.unwrap();
    engine.relock_document().await.unwrap();

    assert!(matches!(engine.export_document().await, Err(UninoteError::Validation(_))));
    // Backups read from storage, so the sealed document is still included
    let backup = engine.export_backup().await.unwrap();
    assert_eq!(contents(&backup.all_notes_data["Main"]), vec!["A"]);
}
