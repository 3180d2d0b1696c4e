use crate::error::{ManagerError, Result};
use crate::types::ModelDescriptor;
use std::fs;
use std::path::{Path, PathBuf};

/// Bundle identifier for the app data directory.
pub const BUNDLE_ID: &str = "com.pocketscribe.app";

/// Fixed-name subdirectory holding downloaded model artifacts.
pub const MODELS_DIR_NAME: &str = "whisper-models";

/// File holding persisted app settings.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

// Get app data directory (cross-platform)
pub fn get_app_data_dir() -> Result<PathBuf> {
    let root = dirs::data_dir()
        .ok_or_else(|| ManagerError::StorageUnavailable("no platform data directory".into()))?;
    Ok(root.join(BUNDLE_ID))
}

/// Models directory under an arbitrary root. Split out so tests can run
/// against a temp directory instead of the real data root.
pub fn models_dir_under(root: &Path) -> PathBuf {
    root.join(MODELS_DIR_NAME)
}

/// Create a directory (and intermediate segments) if it does not exist.
/// Safe to call repeatedly.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        ManagerError::StorageUnavailable(format!("failed to create {:?}: {}", path, e))
    })
}

/// Resolve and create the models directory under the app data root.
pub fn ensure_models_dir() -> Result<PathBuf> {
    let dir = models_dir_under(&get_app_data_dir()?);
    ensure_dir(&dir)?;
    Ok(dir)
}

/// Resolved local path for a model's artifact.
pub fn model_file_path(models_dir: &Path, descriptor: &ModelDescriptor) -> PathBuf {
    models_dir.join(descriptor.filename)
}

/// Sidecar path for an in-flight transfer; renamed into place on success.
pub fn partial_file_path(models_dir: &Path, descriptor: &ModelDescriptor) -> PathBuf {
    models_dir.join(format!("{}.part", descriptor.filename))
}
