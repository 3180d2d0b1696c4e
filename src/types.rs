use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// Capability flags for a catalog entry
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelCapabilities {
    pub multilingual: bool,
    pub quantizable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tdrz: Option<bool>,
}

// Immutable catalog entry for a downloadable model
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub url: &'static str,
    pub filename: &'static str,
    /// Hex digest for post-download verification; empty skips verification.
    #[serde(skip)]
    pub sha256: &'static str,
    pub capabilities: ModelCapabilities,
}

// Derived record for a model file confirmed on disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelFileInfo {
    pub path: PathBuf,
    /// Bytes on disk, 0 when the stat failed.
    pub size: u64,
}

// Progress event payload emitted to the UI during a transfer
#[derive(Debug, Clone, Serialize)]
pub struct DownloadProgress {
    pub model: String,
    pub downloaded: u64,
    pub total: Option<u64>,
    /// Fraction in [0, 1]; 0 when the expected size is unknown.
    pub fraction: f64,
    pub message: String,
}

// Catalog row decorated with on-device state, for the model list screen
#[derive(Debug, Clone, Serialize)]
pub struct ModelListEntry {
    pub id: String,
    pub label: String,
    pub filename: String,
    pub capabilities: ModelCapabilities,
    pub downloaded: bool,
    pub size: Option<u64>,
    pub progress: Option<f64>,
    pub current: bool,
}

// Read model of the whole manager, consumed by the UI
#[derive(Debug, Clone, Serialize)]
pub struct ManagerSnapshot {
    pub downloading: bool,
    pub initializing: bool,
    pub current_model: Option<String>,
    pub progress: HashMap<String, f64>,
    pub downloaded: HashMap<String, ModelFileInfo>,
}

// Engine slot status reported to the UI
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub loaded: bool,
    pub model_id: Option<String>,
    pub vad_active: bool,
    pub backend: Option<String>,
}

// Application settings persisted in settings.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_active_model")]
    pub active_model: String,
}

fn default_active_model() -> String {
    "base".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            active_model: default_active_model(),
        }
    }
}
