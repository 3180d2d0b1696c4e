// Host capability probe used to suggest a model size the device can
// actually hold in memory.

use crate::paths;
use sysinfo::System;

/// Total system memory in gigabytes.
pub fn get_total_memory_gb() -> f64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory() as f64 / 1_073_741_824.0
}

/// Pick a catalog model id sized to the available memory. Conservative:
/// the engine holds the whole model resident while transcribing.
pub fn recommend_model_for_memory(total_gb: f64) -> &'static str {
    if total_gb < 4.0 {
        "tiny"
    } else if total_gb < 8.0 {
        "base"
    } else if total_gb < 16.0 {
        "small"
    } else {
        "medium"
    }
}

// Tauri commands

#[tauri::command]
pub fn get_system_memory_gb() -> std::result::Result<f64, String> {
    Ok(get_total_memory_gb())
}

#[tauri::command]
pub fn get_recommended_model() -> std::result::Result<String, String> {
    let gb = get_total_memory_gb();
    let model = recommend_model_for_memory(gb);
    log::info!("System memory: {:.1} GB, recommending model '{}'", gb, model);
    Ok(model.to_string())
}

#[tauri::command]
pub fn get_app_data_path() -> std::result::Result<String, String> {
    paths::get_app_data_dir()
        .map(|p| p.to_string_lossy().to_string())
        .map_err(|e| e.to_string())
}
