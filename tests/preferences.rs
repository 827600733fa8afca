mod common;

use chrono::{Duration, Local, TimeZone};
use serde_json::json;

use common::{RecordingSink, RecordingStorage, fresh, note, with_notes};
use uninote::{AppData, ButtonConfig, NoteButton, Numbering, Preset, StorageGateway};

#[tokio::test(start_paused = true)]
async fn test_old_button_configuration_is_migrated() {
    let storage = RecordingStorage::new();
    storage.seed(&AppData::first_run("Main"), &[("Main", vec![])]).await;
    storage
        .save_setting("buttonConfiguration", &json!({ "activeMode": "completo", "menuShowText": true }))
        .await
        .unwrap();
    let sink = RecordingSink::new();
    let engine = common::start(&storage, &sink).await;

    let config = engine.button_config();
    assert_eq!(config, ButtonConfig::preset(Preset::Complete));
    let saved: ButtonConfig =
        serde_json::from_value(storage.load_setting("buttonConfiguration").await.unwrap().unwrap()).unwrap();
    assert_eq!(saved, config);
}

#[tokio::test(start_paused = true)]
async fn test_button_edits_switch_to_custom_mode() {
    let (engine, storage, _) = fresh().await;
    assert_eq!(engine.button_config(), ButtonConfig::default());

    assert!(engine.toggle_button_visibility(NoteButton::Pin).await);
    engine.set_numbering(Numbering::None).await;
    engine.move_button(NoteButton::Delete, true, 0).await;

    let config = engine.button_config();
    assert_eq!(config.active_mode, "custom");
    assert_eq!(config.left_buttons[0], NoteButton::Delete);
    assert!(!config.right_buttons.contains(&NoteButton::Delete));
    assert!(config.is_visible(NoteButton::Pin));

    let stored = storage.load_setting("buttonConfiguration").await.unwrap().unwrap();
    assert_eq!(stored["numeracion"], "sin-numeracion");
    assert_eq!(stored["activeMode"], "custom");

    engine.apply_button_preset(Preset::Minimal).await;
    assert!(engine.button_config().visible_buttons.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_recent_icons_capped_and_deduplicated() {
    let (engine, storage, _) = fresh().await;
    for i in 0..30 {
        engine.add_recent_icon(&format!("icon{}", i)).await;
    }
    engine.add_recent_icon("icon20").await;

    let recents = engine.recent_icons();
    assert_eq!(recents.len(), 24);
    assert_eq!(recents[0], "icon20");
    assert_eq!(recents[1], "icon29");
    assert_eq!(recents.iter().filter(|i| *i == "icon20").count(), 1);
    assert!(!recents.contains(&"icon5".to_string()));

    let stored = storage.load_setting("Recents").await.unwrap().unwrap();
    assert_eq!(stored.as_array().unwrap().len(), 24);
}

#[tokio::test(start_paused = true)]
async fn test_theme_and_seen_reminders_survive_restart() {
    let (engine, storage, _) = fresh().await;
    engine.set_theme("dark").await;
    engine.mark_notification_seen("n1").await;

    let sink = RecordingSink::new();
    let restarted = common::start(&storage, &sink).await;
    assert_eq!(restarted.theme().as_deref(), Some("dark"));
    assert!(restarted.is_notification_seen("n1"));
    assert!(!restarted.is_notification_seen("n2"));
}

#[tokio::test(start_paused = true)]
async fn test_reminder_report_pops_once_per_slot() {
    let now = Local.with_ymd_and_hms(2030, 5, 1, 9, 0, 0).single().unwrap();
    let mut soon = note("soon", "<b>Call</b> the bank", vec![]);
    soon.creation_date = (now - Duration::days(1)).to_rfc3339();
    soon.due_date = Some((now + Duration::minutes(30)).to_rfc3339());
    let mut later = note("later", "Next week", vec![]);
    later.due_date = Some((now + Duration::days(7)).to_rfc3339());
    let (engine, storage, _) = with_notes(vec![soon, later]).await;

    let first = engine.check_reminders(now).await.unwrap();
    assert_eq!(first.reminders.len(), 1);
    assert_eq!(first.reminders[0].text, "Call the bank");
    assert!(first.has_unseen);
    assert!(first.show_popup);
    assert_eq!(
        storage.load_setting("LastMorningReport").await.unwrap(),
        Some(json!("2030-05-01"))
    );

    engine.mark_notification_seen("soon").await;
    let second = engine.check_reminders(now + Duration::minutes(5)).await.unwrap();
    assert!(!second.show_popup);
    assert!(!second.has_unseen);

    // The noon slot starts its own report
    let noon = engine.check_reminders(now + Duration::hours(3)).await.unwrap();
    assert!(noon.reminders[0].is_overdue);
    assert!(noon.show_popup);
}
