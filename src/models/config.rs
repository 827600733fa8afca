// Engine configuration
// Stored as YAML frontmatter in config.md, overridable field by field

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub debounce_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub storage: StorageKind,
    pub log_level: String,
    pub password_iterations: u32,
    pub default_document_name: String,
    pub recent_icons_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            data_dir: None,
            storage: StorageKind::File,
            log_level: "info".to_string(),
            password_iterations: crate::crypto::DEFAULT_ITERATIONS,
            default_document_name: "My First Uninote".to_string(),
            recent_icons_limit: 24,
        }
    }
}

/// Partial configuration (all fields optional)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfigOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_document_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_icons_limit: Option<usize>,
}

impl EngineConfig {
    pub fn with_override(&self, over: &EngineConfigOverride) -> Self {
        Self {
            debounce_ms: over.debounce_ms.unwrap_or(self.debounce_ms),
            data_dir: over.data_dir.clone().or_else(|| self.data_dir.clone()),
            storage: over.storage.unwrap_or(self.storage),
            log_level: over.log_level.clone().unwrap_or_else(|| self.log_level.clone()),
            password_iterations: over.password_iterations.unwrap_or(self.password_iterations),
            default_document_name: over
                .default_document_name
                .clone()
                .unwrap_or_else(|| self.default_document_name.clone()),
            recent_icons_limit: over.recent_icons_limit.unwrap_or(self.recent_icons_limit),
        }
    }

    /// Data directory, defaulting to ~/.uninote
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".uninote")))
    }

    /// In-memory storage and a short iteration count, for tests and demos
    pub fn ephemeral() -> Self {
        Self {
            storage: StorageKind::Memory,
            password_iterations: 1_000,
            ..Self::default()
        }
    }
}
