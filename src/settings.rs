// Persisted app settings. A small JSON file owned by the manager keeps the
// active model choice across launches; the path is injected alongside the
// models directory so nothing here reaches for ambient locations.

use crate::error::{ManagerError, Result};
use crate::manager::ModelManager;
use crate::types::AppSettings;
use std::fs;
use std::path::Path;
use tauri::State;

fn load_from(path: &Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to parse settings, using defaults: {}", e);
                AppSettings::default()
            }
        },
        Err(_) => AppSettings::default(),
    }
}

fn save_to(path: &Path, settings: &AppSettings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ManagerError::StorageUnavailable(format!("serialize settings: {}", e)))?;
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }
    fs::write(path, json)
        .map_err(|e| ManagerError::StorageUnavailable(format!("write settings: {}", e)))?;
    Ok(())
}

impl ModelManager {
    /// Last selected model id; a missing or corrupt settings file yields
    /// the default.
    pub fn active_model(&self) -> String {
        load_from(&self.settings_path).active_model
    }

    pub fn set_active_model(&self, model_id: &str) -> Result<()> {
        let mut settings = load_from(&self.settings_path);
        settings.active_model = model_id.to_string();
        save_to(&self.settings_path, &settings)
    }
}

// Tauri commands

#[tauri::command]
pub async fn get_active_model_command(
    manager: State<'_, ModelManager>,
) -> std::result::Result<String, String> {
    Ok(manager.active_model())
}

#[tauri::command]
pub async fn set_active_model_command(
    model_id: String,
    manager: State<'_, ModelManager>,
) -> std::result::Result<String, String> {
    manager
        .set_active_model(&model_id)
        .map_err(|e| e.to_string())?;
    Ok(format!("Active model set to {}", model_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_from(&dir.path().join("nope.json"));
        assert_eq!(settings.active_model, "base");
    }

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = AppSettings {
            active_model: "small.en".to_string(),
        };
        save_to(&path, &settings).unwrap();
        assert_eq!(load_from(&path).active_model, "small.en");
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_from(&path).active_model, "base");
    }

    #[test]
    fn manager_owns_its_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_models_dir(dir.path().to_path_buf(), None);
        assert_eq!(manager.active_model(), "base");
        manager.set_active_model("small.en").unwrap();
        assert_eq!(manager.active_model(), "small.en");
        assert!(dir.path().join("settings.json").exists());
    }
}
