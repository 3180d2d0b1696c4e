// Engine lifecycle: drives the single native-engine slot through
// initialize / reset / delete. The slot lock serializes all three, so a
// second initialize queues behind an in-flight one instead of racing it.

pub mod backend;

use crate::catalog;
use crate::error::{ManagerError, Result};
use crate::manager::ModelManager;
use crate::paths;
use crate::types::{DownloadProgress, EngineStatus};
use backend::EngineHandle;
use tauri::{AppHandle, Emitter, State};

/// The single engine slot. Holds the initialized native handles and the
/// id of the model backing them; `vad` never outlives `engine`.
#[derive(Default)]
pub struct EngineSlot {
    loaded: Option<LoadedEngine>,
}

struct LoadedEngine {
    model_id: String,
    engine: Box<dyn EngineHandle>,
    vad: Option<Box<dyn EngineHandle>>,
}

impl EngineSlot {
    fn model_id(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.model_id.as_str())
    }

    /// Release whatever the slot holds, best effort. Native release
    /// failures are logged, never propagated.
    fn release(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            if let Some(vad) = loaded.vad {
                if let Err(e) = vad.release() {
                    log::warn!("VAD release failed for '{}': {}", loaded.model_id, e);
                }
            }
            if let Err(e) = loaded.engine.release() {
                log::warn!("Engine release failed for '{}': {}", loaded.model_id, e);
            }
            log::info!("Released engine for model '{}'", loaded.model_id);
        }
    }
}

impl ModelManager {
    /// Initialize the native engine for a model, downloading the backing
    /// file first when necessary. Any previously held engine is released
    /// before the new one is installed. VAD initialization failure is
    /// non-fatal: the primary handle survives with `vad_active = false`.
    pub async fn initialize_engine<F>(
        &self,
        model_id: &str,
        init_vad: bool,
        on_progress: F,
    ) -> Result<EngineStatus>
    where
        F: Fn(DownloadProgress) + Send + Sync,
    {
        // Unknown ids fail before any filesystem or network side effect.
        catalog::find_model(model_id)
            .ok_or_else(|| ManagerError::UnknownModel(model_id.to_string()))?;

        let mut slot = self.slot.lock().await;

        self.state.lock().unwrap().set_initializing(true);
        let _initializing = scopeguard::guard((), |_| {
            self.state.lock().unwrap().set_initializing(false);
        });

        let path = self.acquire_model(model_id, on_progress).await?;

        // Capability probe before any native call; absence is a typed
        // result, not a crash.
        let backend = self
            .backend
            .as_ref()
            .ok_or(ManagerError::EngineUnavailable)?
            .clone();

        // Conservative lifecycle rule: always release before replace.
        slot.release();
        self.state.lock().unwrap().set_current_model(None);

        log::info!(
            "Initializing {} engine for model '{}' from {:?}",
            backend.name(),
            model_id,
            path
        );
        let engine = backend
            .init(&path)
            .map_err(|e| ManagerError::EngineInitFailed(e.to_string()))?;

        let vad = if init_vad {
            match backend.init_vad(&path) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    let soft = ManagerError::VadInitFailed(e.to_string());
                    log::warn!("{} (continuing without VAD)", soft);
                    None
                }
            }
        } else {
            None
        };

        let status = EngineStatus {
            loaded: true,
            model_id: Some(model_id.to_string()),
            vad_active: vad.is_some(),
            backend: Some(backend.name().to_string()),
        };

        slot.loaded = Some(LoadedEngine {
            model_id: model_id.to_string(),
            engine,
            vad,
        });
        self.state
            .lock()
            .unwrap()
            .set_current_model(Some(model_id.to_string()));

        if let Err(e) = self.set_active_model(model_id) {
            log::warn!("Failed to persist active model: {}", e);
        }

        Ok(status)
    }

    /// Release the engine and VAD handles and clear the slot.
    pub async fn reset_engine(&self) {
        let mut slot = self.slot.lock().await;
        slot.release();
        self.state.lock().unwrap().set_current_model(None);
    }

    /// Delete a model's backing file and cache entries. When the model is
    /// currently loaded, the native handles are released first (best
    /// effort). Without a file-info entry this is a warning no-op.
    pub async fn delete_model(&self, model_id: &str) -> Result<()> {
        let desc = catalog::find_model(model_id)
            .ok_or_else(|| ManagerError::UnknownModel(model_id.to_string()))?;

        let mut slot = self.slot.lock().await;

        if !self.state.lock().unwrap().is_downloaded(model_id) {
            log::warn!("Delete requested for model '{}' which is not downloaded", model_id);
            return Ok(());
        }

        if slot.model_id() == Some(model_id) {
            slot.release();
            self.state.lock().unwrap().set_current_model(None);
        }

        let dest = paths::model_file_path(&self.models_dir, desc);
        let removal = match tokio::fs::remove_file(&dest).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        // A stale partial transfer goes with the model.
        let _ = tokio::fs::remove_file(paths::partial_file_path(&self.models_dir, desc)).await;

        match removal {
            Ok(()) => {
                self.state.lock().unwrap().remove_model(model_id);
                log::info!("Deleted model '{}'", model_id);
                Ok(())
            }
            Err(e) => {
                // Keep the cache consistent with what is actually on disk.
                let mut state = self.state.lock().unwrap();
                match std::fs::metadata(&dest) {
                    Ok(meta) => state.set_file_info(model_id, dest.clone(), meta.len()),
                    Err(_) => state.remove_model(model_id),
                }
                Err(ManagerError::DeleteFailed(e.to_string()))
            }
        }
    }

    /// Current engine slot status for the UI.
    pub async fn engine_status(&self) -> EngineStatus {
        let slot = self.slot.lock().await;
        EngineStatus {
            loaded: slot.loaded.is_some(),
            model_id: slot.model_id().map(str::to_string),
            vad_active: slot
                .loaded
                .as_ref()
                .map_or(false, |l| l.vad.is_some()),
            backend: self.backend.as_ref().map(|b| b.name().to_string()),
        }
    }

    /// Best-effort release for app shutdown paths that cannot await.
    pub fn release_on_exit(&self) {
        if let Ok(mut slot) = self.slot.try_lock() {
            slot.release();
            if let Ok(mut state) = self.state.lock() {
                state.set_current_model(None);
            }
        }
    }
}

// Tauri commands

#[tauri::command]
pub async fn initialize_engine(
    model_id: String,
    init_vad: Option<bool>,
    manager: State<'_, ModelManager>,
    app: AppHandle,
) -> std::result::Result<EngineStatus, String> {
    manager
        .initialize_engine(&model_id, init_vad.unwrap_or(false), |progress| {
            let _ = app.emit("download-progress", &progress);
        })
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn reset_engine(
    manager: State<'_, ModelManager>,
) -> std::result::Result<String, String> {
    manager.reset_engine().await;
    Ok("Engine reset".to_string())
}

#[tauri::command]
pub async fn delete_model(
    model_id: String,
    manager: State<'_, ModelManager>,
) -> std::result::Result<String, String> {
    manager
        .delete_model(&model_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(format!("Model '{}' deleted", model_id))
}

#[tauri::command]
pub async fn get_engine_status(
    manager: State<'_, ModelManager>,
) -> std::result::Result<EngineStatus, String> {
    Ok(manager.engine_status().await)
}
