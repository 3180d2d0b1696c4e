// Single owner of all mutable manager state. One instance is constructed
// during Tauri setup and shared through managed state; no module-level
// globals. Filesystem/network coordination lives in `download`, engine
// lifecycle in `engine`, both as impl blocks on this struct.

use crate::catalog;
use crate::engine::backend::EngineBackend;
use crate::engine::EngineSlot;
use crate::error::Result;
use crate::paths;
use crate::state::ManagerState;
use crate::types::{ManagerSnapshot, ModelListEntry};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

pub struct ModelManager {
    pub(crate) models_dir: PathBuf,
    /// Settings file owned by this instance; tests point it at a temp dir.
    pub(crate) settings_path: PathBuf,
    pub(crate) client: reqwest::Client,
    pub(crate) state: Mutex<ManagerState>,
    /// Engine slot; initialize/reset/delete serialize on this lock.
    pub(crate) slot: tokio::sync::Mutex<EngineSlot>,
    pub(crate) backend: Option<Arc<dyn EngineBackend>>,
    /// Per-model locks so a second acquisition for the same id awaits the
    /// first instead of racing it.
    pub(crate) download_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    /// Per-model cancellation flags observed by the transfer loop.
    pub(crate) cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl ModelManager {
    /// Construct against the real app data root.
    pub fn new(backend: Option<Arc<dyn EngineBackend>>) -> Result<Self> {
        let models_dir = paths::ensure_models_dir()?;
        let settings_path = paths::get_app_data_dir()?.join(paths::SETTINGS_FILE_NAME);
        Ok(Self::assemble(models_dir, settings_path, backend))
    }

    /// Construct against an explicit models directory (tests use a temp
    /// dir; the directory must already exist). The settings file lives
    /// inside that directory.
    pub fn with_models_dir(models_dir: PathBuf, backend: Option<Arc<dyn EngineBackend>>) -> Self {
        let settings_path = models_dir.join(paths::SETTINGS_FILE_NAME);
        Self::assemble(models_dir, settings_path, backend)
    }

    fn assemble(
        models_dir: PathBuf,
        settings_path: PathBuf,
        backend: Option<Arc<dyn EngineBackend>>,
    ) -> Self {
        Self {
            models_dir,
            settings_path,
            client: crate::download::transfer::create_http_client(),
            state: Mutex::new(ManagerState::default()),
            slot: tokio::sync::Mutex::new(EngineSlot::default()),
            backend,
            download_locks: Mutex::new(HashMap::new()),
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        self.state.lock().unwrap().snapshot()
    }

    /// Catalog decorated with on-device state for the model list screen.
    pub fn list_models(&self) -> Vec<ModelListEntry> {
        let state = self.state.lock().unwrap();
        catalog::CATALOG
            .iter()
            .map(|desc| {
                let info = state.file_info_for(desc.id);
                ModelListEntry {
                    id: desc.id.to_string(),
                    label: desc.label.to_string(),
                    filename: desc.filename.to_string(),
                    capabilities: desc.capabilities,
                    downloaded: info.is_some(),
                    size: info.map(|i| i.size),
                    progress: state.progress_for(desc.id),
                    current: state.current_model() == Some(desc.id),
                }
            })
            .collect()
    }

    /// Reconcile the catalog against the storage directory on startup.
    /// Present files populate the file-info cache; per-model stat failures
    /// are logged and do not abort the scan. Idempotent.
    pub fn scan_existing_models(&self) {
        for desc in catalog::CATALOG {
            let path = paths::model_file_path(&self.models_dir, desc);
            if !path.exists() {
                continue;
            }
            let size = match std::fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(e) => {
                    log::warn!("Stat failed for existing model '{}': {}", desc.id, e);
                    0
                }
            };
            log::info!(
                "Found existing model '{}' ({} bytes) at {:?}",
                desc.id,
                size,
                path
            );
            self.state
                .lock()
                .unwrap()
                .set_file_info(desc.id, path, size);
        }
    }

    pub(crate) fn download_lock(&self, model_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.download_locks
            .lock()
            .unwrap()
            .entry(model_id.to_string())
            .or_default()
            .clone()
    }

    pub(crate) fn cancel_flag(&self, model_id: &str) -> Arc<AtomicBool> {
        self.cancel_flags
            .lock()
            .unwrap()
            .entry(model_id.to_string())
            .or_default()
            .clone()
    }
}
