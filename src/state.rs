// Shared read model for the UI: per-model downloaded files, per-model
// download progress, and the global downloading/initializing flags.
// Owned by a single ModelManager instance; only the download coordinator
// writes progress and only the engine lifecycle writes the engine fields.

use crate::types::{ManagerSnapshot, ModelFileInfo};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct ManagerState {
    /// One entry per model whose file has been confirmed on disk.
    file_info: HashMap<String, ModelFileInfo>,
    /// Fractional progress in [0, 1] per model with an active or finished
    /// download. Monotonically non-decreasing per model.
    progress: HashMap<String, f64>,
    /// Number of transfers currently in flight; surfaced as a bool.
    active_downloads: usize,
    /// True while the engine slot is being (re)initialized.
    initializing: bool,
    /// Model id backing the current engine handle, if any.
    current_model: Option<String>,
}

impl ManagerState {
    pub fn begin_download(&mut self, model_id: &str) {
        self.active_downloads += 1;
        self.progress.entry(model_id.to_string()).or_insert(0.0);
    }

    pub fn end_download(&mut self) {
        self.active_downloads = self.active_downloads.saturating_sub(1);
    }

    /// Record a progress fraction, clamped to [0, 1] and never below the
    /// previously published value. Returns the effective fraction.
    pub fn publish_progress(&mut self, model_id: &str, fraction: f64) -> f64 {
        let fraction = fraction.clamp(0.0, 1.0);
        let entry = self.progress.entry(model_id.to_string()).or_insert(0.0);
        if fraction > *entry {
            *entry = fraction;
        }
        *entry
    }

    pub fn progress_for(&self, model_id: &str) -> Option<f64> {
        self.progress.get(model_id).copied()
    }

    /// Drop the progress entry for a failed or cancelled transfer; the
    /// value is reconstructable and only successful downloads keep 1.0.
    pub fn clear_progress(&mut self, model_id: &str) {
        self.progress.remove(model_id);
    }

    pub fn set_file_info(&mut self, model_id: &str, path: PathBuf, size: u64) {
        self.file_info
            .insert(model_id.to_string(), ModelFileInfo { path, size });
    }

    pub fn file_info_for(&self, model_id: &str) -> Option<&ModelFileInfo> {
        self.file_info.get(model_id)
    }

    pub fn is_downloaded(&self, model_id: &str) -> bool {
        self.file_info.contains_key(model_id)
    }

    /// Remove every cached entry for a model (on deletion).
    pub fn remove_model(&mut self, model_id: &str) {
        self.file_info.remove(model_id);
        self.progress.remove(model_id);
    }

    pub fn set_initializing(&mut self, value: bool) {
        self.initializing = value;
    }

    pub fn set_current_model(&mut self, model_id: Option<String>) {
        self.current_model = model_id;
    }

    pub fn current_model(&self) -> Option<&str> {
        self.current_model.as_deref()
    }

    pub fn is_downloading(&self) -> bool {
        self.active_downloads > 0
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            downloading: self.is_downloading(),
            initializing: self.initializing,
            current_model: self.current_model.clone(),
            progress: self.progress.clone(),
            downloaded: self.file_info.clone(),
        }
    }
}
