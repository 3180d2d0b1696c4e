pub mod catalog;
pub mod download;
pub mod engine;
pub mod error;
pub mod manager;
pub mod paths;
pub mod settings;
pub mod state;
pub mod system;
pub mod types;

use manager::ModelManager;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(
            tauri_plugin_log::Builder::new()
                .level(log::LevelFilter::Info)
                .build(),
        )
        .plugin(tauri_plugin_fs::init())
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let manager = ModelManager::new(engine::backend::native_backend())?;
            manager.scan_existing_models();
            app.manage(manager);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            download::download_model,
            download::cancel_download,
            download::list_models,
            download::check_model_downloaded,
            download::get_manager_status,
            engine::initialize_engine,
            engine::reset_engine,
            engine::delete_model,
            engine::get_engine_status,
            settings::get_active_model_command,
            settings::set_active_model_command,
            system::get_system_memory_gb,
            system::get_recommended_model,
            system::get_app_data_path,
        ])
        .on_window_event(|window, event| {
            // Release native engine handles when the window is closing
            if let tauri::WindowEvent::CloseRequested { .. } = event {
                if let Some(manager) = window.try_state::<ModelManager>() {
                    manager.release_on_exit();
                }
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
