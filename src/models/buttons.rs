// Per-note action button layout, persisted under the "buttonConfiguration" setting
// Button and mode ids keep the identifiers used by stored configurations

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoteButton {
    #[serde(rename = "estado")]
    Status,
    #[serde(rename = "fechaLimite")]
    DueDate,
    #[serde(rename = "candado")]
    Lock,
    #[serde(rename = "duplicar")]
    Duplicate,
    #[serde(rename = "fijar")]
    Pin,
    #[serde(rename = "emojiPicker")]
    Icon,
    #[serde(rename = "agregarHermana")]
    AddSibling,
    #[serde(rename = "agregarSubNota")]
    AddChild,
    #[serde(rename = "moverInicio")]
    MoveTop,
    #[serde(rename = "moverFinal")]
    MoveBottom,
    #[serde(rename = "moverPosicion")]
    MovePosition,
    #[serde(rename = "promover")]
    Promote,
    #[serde(rename = "archivar")]
    Archive,
    #[serde(rename = "eliminar")]
    Delete,
}

use NoteButton::*;

const LEFT_BUTTONS: [NoteButton; 5] = [Status, DueDate, Lock, Duplicate, Pin];
const RIGHT_BUTTONS: [NoteButton; 9] = [
    Icon, AddSibling, AddChild, MoveTop, MoveBottom, MovePosition, Promote, Archive, Delete,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Numbering {
    #[serde(rename = "sin-numeracion")]
    None,
    #[default]
    #[serde(rename = "antes-contenido")]
    BeforeContent,
    #[serde(rename = "antes-checkbox")]
    BeforeCheckbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Minimal,
    Standard,
    Complete,
}

impl Preset {
    pub fn id(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "estandar",
            Self::Complete => "completo",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "minimal" => Some(Self::Minimal),
            "estandar" | "standard" => Some(Self::Standard),
            "completo" | "complete" => Some(Self::Complete),
            _ => None,
        }
    }

    fn visible(self) -> Vec<NoteButton> {
        match self {
            Self::Minimal => Vec::new(),
            Self::Standard => vec![Status, Icon, AddSibling, AddChild, Archive, Delete],
            Self::Complete => LEFT_BUTTONS.iter().chain(RIGHT_BUTTONS.iter()).copied().collect(),
        }
    }

    fn menu_show_text(self) -> bool {
        !matches!(self, Self::Standard)
    }
}

pub const CUSTOM_MODE: &str = "custom";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonConfig {
    #[serde(rename = "numeracion", default)]
    pub numbering: Numbering,
    #[serde(default)]
    pub left_buttons: Vec<NoteButton>,
    #[serde(default)]
    pub right_buttons: Vec<NoteButton>,
    #[serde(default)]
    pub visible_buttons: BTreeSet<NoteButton>,
    #[serde(default)]
    pub menu_show_text: bool,
    #[serde(default)]
    pub active_mode: String,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self::preset(Preset::Standard)
    }
}

impl ButtonConfig {
    pub fn preset(preset: Preset) -> Self {
        Self {
            numbering: Numbering::BeforeContent,
            left_buttons: LEFT_BUTTONS.to_vec(),
            right_buttons: RIGHT_BUTTONS.to_vec(),
            visible_buttons: preset.visible().into_iter().collect(),
            menu_show_text: preset.menu_show_text(),
            active_mode: preset.id().to_string(),
        }
    }

    /// Repair configurations saved before the button lists were stored.
    /// Returns true when something changed and the result should be saved back.
    pub fn migrate(&mut self) -> bool {
        if !self.left_buttons.is_empty() && !self.right_buttons.is_empty() {
            return false;
        }
        let preset = Preset::from_id(&self.active_mode).unwrap_or(Preset::Standard);
        let fresh = Self::preset(preset);
        self.left_buttons = fresh.left_buttons;
        self.right_buttons = fresh.right_buttons;
        if self.visible_buttons.is_empty() {
            self.visible_buttons = fresh.visible_buttons;
        }
        if self.active_mode.is_empty() {
            self.active_mode = fresh.active_mode;
        }
        true
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        *self = Self::preset(preset);
    }

    pub fn is_visible(&self, button: NoteButton) -> bool {
        self.visible_buttons.contains(&button)
    }

    /// Buttons that only appear in the overflow menu, in layout order
    pub fn menu_buttons(&self) -> Vec<NoteButton> {
        self.left_buttons
            .iter()
            .chain(self.right_buttons.iter())
            .copied()
            .filter(|b| !self.is_visible(*b))
            .collect()
    }

    pub fn toggle_visibility(&mut self, button: NoteButton) -> bool {
        let visible = if self.visible_buttons.remove(&button) {
            false
        } else {
            self.visible_buttons.insert(button);
            true
        };
        self.mark_custom();
        visible
    }

    pub fn set_numbering(&mut self, numbering: Numbering) {
        self.numbering = numbering;
        self.mark_custom();
    }

    pub fn toggle_menu_show_text(&mut self) {
        self.menu_show_text = !self.menu_show_text;
        self.mark_custom();
    }

    /// Move a button to the left or right column at `index`
    pub fn move_button(&mut self, button: NoteButton, to_left: bool, index: usize) {
        self.left_buttons.retain(|b| *b != button);
        self.right_buttons.retain(|b| *b != button);
        let column = if to_left { &mut self.left_buttons } else { &mut self.right_buttons };
        let index = index.min(column.len());
        column.insert(index, button);
        self.mark_custom();
    }

    fn mark_custom(&mut self) {
        if !self.active_mode.starts_with("custom_") {
            self.active_mode = CUSTOM_MODE.to_string();
        }
    }
}
