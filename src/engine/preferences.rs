// Persisted user preferences: theme, recent icons, seen reminders, note buttons

use std::collections::{BTreeSet, VecDeque};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::Engine;
use crate::models::{ButtonConfig, NoteButton, Numbering, Preset};
use crate::storage::{StorageResult, keys, load_setting_as, save_setting_as};

fn logged<T>(key: &str, loaded: StorageResult<Option<T>>) -> Option<T> {
    match loaded {
        Ok(value) => value,
        Err(e) => {
            warn!("[load_preferences] Could not read '{}': {}", key, e);
            None
        }
    }
}

impl Engine {
    /// Load every persisted preference. Failures fall back to defaults.
    pub(crate) async fn load_preferences(&self) {
        let storage = self.storage.as_ref();
        let theme = logged(keys::THEME, load_setting_as::<String>(storage, keys::THEME).await);
        let recents = logged(
            keys::RECENT_ICONS,
            load_setting_as::<Vec<String>>(storage, keys::RECENT_ICONS).await,
        )
        .unwrap_or_default();
        let seen = logged(
            keys::SEEN_NOTIFICATIONS,
            load_setting_as::<BTreeSet<String>>(storage, keys::SEEN_NOTIFICATIONS).await,
        )
        .unwrap_or_default();
        let stored_buttons = logged(
            keys::BUTTON_CONFIGURATION,
            load_setting_as::<ButtonConfig>(storage, keys::BUTTON_CONFIGURATION).await,
        );

        let (buttons, save_back) = match stored_buttons {
            Some(mut config) => {
                let migrated = config.migrate();
                if migrated {
                    info!("[load_preferences] Migrated button configuration");
                }
                (config, migrated)
            }
            None => (ButtonConfig::default(), false),
        };

        let limit = self.config.recent_icons_limit;
        {
            let mut prefs = self.session.preferences.write();
            prefs.theme = theme;
            prefs.recent_icons = recents.into_iter().take(limit).collect();
            prefs.seen_notifications = seen;
            prefs.button_config = buttons.clone();
        }
        if save_back {
            self.persist_setting(keys::BUTTON_CONFIGURATION, &buttons).await;
        }
        debug!("[load_preferences] Preferences loaded");
    }

    /// Write one setting; failures reach the user but never fail the caller
    async fn persist_setting<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let saved = save_setting_as(self.storage.as_ref(), key, value).await;
        let _ = self.report("save_setting", saved.map_err(Into::into));
    }

    // ============================================
    // THEME
    // ============================================

    pub fn theme(&self) -> Option<String> {
        self.session.preferences.read().theme.clone()
    }

    pub async fn set_theme(&self, theme: &str) {
        self.session.preferences.write().theme = Some(theme.to_string());
        self.persist_setting(keys::THEME, theme).await;
    }

    // ============================================
    // RECENT ICONS
    // ============================================

    pub fn recent_icons(&self) -> Vec<String> {
        self.session.preferences.read().recent_icons.iter().cloned().collect()
    }

    /// Move the icon to the front of the recent list, dropping the oldest past the limit
    pub async fn add_recent_icon(&self, icon: &str) {
        let limit = self.config.recent_icons_limit;
        let recents: Vec<String> = {
            let mut prefs = self.session.preferences.write();
            let list: &mut VecDeque<String> = &mut prefs.recent_icons;
            list.retain(|existing| existing != icon);
            list.push_front(icon.to_string());
            list.truncate(limit);
            list.iter().cloned().collect()
        };
        self.persist_setting(keys::RECENT_ICONS, &recents).await;
    }

    // ============================================
    // SEEN REMINDERS
    // ============================================

    pub fn is_notification_seen(&self, note_id: &str) -> bool {
        self.session.preferences.read().seen_notifications.contains(note_id)
    }

    pub async fn mark_notification_seen(&self, note_id: &str) {
        let seen = {
            let mut prefs = self.session.preferences.write();
            if !prefs.seen_notifications.insert(note_id.to_string()) {
                return;
            }
            prefs.seen_notifications.clone()
        };
        self.persist_setting(keys::SEEN_NOTIFICATIONS, &seen).await;
    }

    // ============================================
    // NOTE BUTTONS
    // ============================================

    pub fn button_config(&self) -> ButtonConfig {
        self.session.preferences.read().button_config.clone()
    }

    async fn update_buttons<R>(&self, f: impl FnOnce(&mut ButtonConfig) -> R) -> R {
        let (value, config) = {
            let mut prefs = self.session.preferences.write();
            let value = f(&mut prefs.button_config);
            (value, prefs.button_config.clone())
        };
        self.persist_setting(keys::BUTTON_CONFIGURATION, &config).await;
        value
    }

    pub async fn apply_button_preset(&self, preset: Preset) {
        self.update_buttons(|config| config.apply_preset(preset)).await;
    }

    /// Returns whether the button is visible afterwards
    pub async fn toggle_button_visibility(&self, button: NoteButton) -> bool {
        self.update_buttons(|config| config.toggle_visibility(button)).await
    }

    pub async fn set_numbering(&self, numbering: Numbering) {
        self.update_buttons(|config| config.set_numbering(numbering)).await;
    }

    pub async fn toggle_menu_show_text(&self) {
        self.update_buttons(ButtonConfig::toggle_menu_show_text).await;
    }

    pub async fn move_button(&self, button: NoteButton, to_left: bool, index: usize) {
        self.update_buttons(|config| config.move_button(button, to_left, index)).await;
    }
}
