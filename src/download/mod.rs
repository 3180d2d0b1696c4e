// Download coordinator: reconciles the catalog against on-device storage,
// performs resumable transfers with progress reporting, and keeps the
// file-info cache in sync with disk.

pub(crate) mod checksum;
#[cfg(test)]
pub(crate) mod testserver;
pub(crate) mod transfer;

use crate::catalog;
use crate::error::{ManagerError, Result};
use crate::manager::ModelManager;
use crate::paths;
use crate::types::{DownloadProgress, ManagerSnapshot, ModelDescriptor, ModelListEntry};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tauri::{AppHandle, Emitter, State};

impl ModelManager {
    /// Ensure a model's artifact is present locally, downloading it when
    /// absent. Returns the resolved local path.
    ///
    /// A file already on disk short-circuits without network activity and
    /// refreshes the file-info cache from a stat. Concurrent calls for the
    /// same model await each other; the second caller then takes the
    /// short-circuit path.
    pub async fn acquire_model<F>(&self, model_id: &str, on_progress: F) -> Result<PathBuf>
    where
        F: Fn(DownloadProgress) + Send + Sync,
    {
        let desc = catalog::find_model(model_id)
            .ok_or_else(|| ManagerError::UnknownModel(model_id.to_string()))?;
        self.acquire_descriptor(desc, on_progress).await
    }

    pub(crate) async fn acquire_descriptor<F>(
        &self,
        desc: &'static ModelDescriptor,
        on_progress: F,
    ) -> Result<PathBuf>
    where
        F: Fn(DownloadProgress) + Send + Sync,
    {
        let model_id = desc.id;
        let lock = self.download_lock(model_id);
        let _in_flight = lock.lock().await;

        let dest = paths::model_file_path(&self.models_dir, desc);

        // Stat-first: an existing file wins, whatever its size. A failed
        // stat is "unknown", cached as size 0 rather than failing the call.
        if dest.exists() {
            let size = match tokio::fs::metadata(&dest).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    log::warn!("Stat failed for model '{}': {}", model_id, e);
                    0
                }
            };
            let fraction = {
                let mut state = self.state.lock().unwrap();
                state.set_file_info(model_id, dest.clone(), size);
                state.publish_progress(model_id, 1.0)
            };
            on_progress(DownloadProgress {
                model: model_id.to_string(),
                downloaded: size,
                total: Some(size),
                fraction,
                message: format!("Model '{}' already on device", model_id),
            });
            return Ok(dest);
        }

        log::info!(
            "Starting model '{}' download from: {}",
            model_id,
            desc.url
        );

        let cancel = self.cancel_flag(model_id);
        cancel.store(false, Ordering::Relaxed);

        self.state.lock().unwrap().begin_download(model_id);
        // The downloading flag must clear on every exit path.
        let _downloading = scopeguard::guard((), |_| {
            self.state.lock().unwrap().end_download();
        });

        let part = paths::partial_file_path(&self.models_dir, desc);
        let mut last_reported = -1.0f64;
        let outcome = transfer::download_to_partial(
            &self.client,
            desc.url,
            &part,
            &cancel,
            |written, expected| {
                let fraction = self
                    .state
                    .lock()
                    .unwrap()
                    .publish_progress(model_id, transfer::progress_fraction(written, expected));
                // Emit on meaningful movement only, to limit event spam.
                let done = expected.map_or(false, |total| written >= total);
                if fraction - last_reported >= 0.01 || done {
                    last_reported = fraction;
                    on_progress(DownloadProgress {
                        model: model_id.to_string(),
                        downloaded: written,
                        total: expected,
                        fraction,
                        message: format!(
                            "Downloading model '{}': {:.2} MB",
                            model_id,
                            written as f64 / 1_048_576.0
                        ),
                    });
                }
            },
        )
        .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state.lock().unwrap().clear_progress(model_id);
                return Err(e);
            }
        };

        if !transfer::is_terminal_success(outcome.status) {
            self.state.lock().unwrap().clear_progress(model_id);
            return Err(ManagerError::download_failed(
                outcome.status,
                "transfer ended with non-success status",
            ));
        }

        if let Err(e) = checksum::verify_sha256(&part, desc.sha256) {
            // A fully transferred but corrupt artifact cannot be resumed.
            let _ = tokio::fs::remove_file(&part).await;
            self.state.lock().unwrap().clear_progress(model_id);
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&part, &dest).await {
            self.state.lock().unwrap().clear_progress(model_id);
            return Err(ManagerError::transport(format!(
                "failed to move artifact: {}",
                e
            )));
        }

        // Re-verify against disk instead of trusting the byte counter.
        let size = match tokio::fs::metadata(&dest).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                log::warn!("Stat after download failed for '{}': {}", model_id, e);
                0
            }
        };
        let fraction = {
            let mut state = self.state.lock().unwrap();
            state.set_file_info(model_id, dest.clone(), size);
            state.publish_progress(model_id, 1.0)
        };
        on_progress(DownloadProgress {
            model: model_id.to_string(),
            downloaded: outcome.bytes_written,
            total: Some(outcome.bytes_written),
            fraction,
            message: format!("Model '{}' ready", model_id),
        });

        log::info!("Model '{}' ready at: {:?}", model_id, dest);
        Ok(dest)
    }

    /// Request cancellation of an in-flight download. The transfer loop
    /// observes the flag between chunks; the partial file is kept so a
    /// later download resumes it.
    pub fn cancel_download(&self, model_id: &str) -> Result<()> {
        catalog::find_model(model_id)
            .ok_or_else(|| ManagerError::UnknownModel(model_id.to_string()))?;
        self.cancel_flag(model_id).store(true, Ordering::Relaxed);
        log::info!("Cancellation requested for model '{}'", model_id);
        Ok(())
    }
}

// Tauri commands

#[tauri::command]
pub async fn download_model(
    model_id: String,
    manager: State<'_, ModelManager>,
    app: AppHandle,
) -> std::result::Result<String, String> {
    let path = manager
        .acquire_model(&model_id, |progress| {
            let _ = app.emit("download-progress", &progress);
        })
        .await
        .map_err(|e| e.to_string())?;

    Ok(path.to_string_lossy().to_string())
}

#[tauri::command]
pub async fn cancel_download(
    model_id: String,
    manager: State<'_, ModelManager>,
) -> std::result::Result<String, String> {
    manager
        .cancel_download(&model_id)
        .map_err(|e| e.to_string())?;
    Ok(format!("Cancellation requested for model '{}'", model_id))
}

#[tauri::command]
pub async fn list_models(
    manager: State<'_, ModelManager>,
) -> std::result::Result<Vec<ModelListEntry>, String> {
    Ok(manager.list_models())
}

#[tauri::command]
pub async fn check_model_downloaded(
    model_id: String,
    manager: State<'_, ModelManager>,
) -> std::result::Result<bool, String> {
    Ok(manager.snapshot().downloaded.contains_key(&model_id))
}

#[tauri::command]
pub async fn get_manager_status(
    manager: State<'_, ModelManager>,
) -> std::result::Result<ManagerSnapshot, String> {
    Ok(manager.snapshot())
}

#[cfg(test)]
mod tests {
    use super::testserver::{self, ServerOptions};
    use crate::error::ManagerError;
    use crate::manager::ModelManager;
    use crate::types::{ModelCapabilities, ModelDescriptor};
    use std::sync::Mutex;
    use std::time::Duration;

    fn leak(s: String) -> &'static str {
        Box::leak(s.into_boxed_str())
    }

    // Catalog-shaped descriptor pointing at a local fixture server. The id
    // stays a real catalog id so cancel_download resolves it.
    fn descriptor(url: String, sha256: &'static str) -> &'static ModelDescriptor {
        Box::leak(Box::new(ModelDescriptor {
            id: "tiny",
            label: "Tiny (multilingual)",
            url: leak(url),
            filename: "ggml-tiny.bin",
            sha256,
            capabilities: ModelCapabilities {
                multilingual: true,
                quantizable: true,
                tdrz: None,
            },
        }))
    }

    #[tokio::test]
    async fn download_lands_file_with_monotonic_progress() {
        let server = testserver::spawn(ServerOptions {
            body: b"0123456789abcdef".to_vec(),
            ..Default::default()
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_models_dir(dir.path().to_path_buf(), None);
        let desc = descriptor(server.url.clone(), "");

        let fractions = Mutex::new(Vec::new());
        let path = manager
            .acquire_descriptor(desc, |p| fractions.lock().unwrap().push(p.fraction))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"0123456789abcdef");
        let fractions = fractions.into_inner().unwrap();
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*fractions.last().unwrap(), 1.0);
        let snap = manager.snapshot();
        assert_eq!(snap.progress["tiny"], 1.0);
        assert_eq!(snap.downloaded["tiny"].size, 16);
        assert!(!snap.downloading);
        assert_eq!(server.get_count(), 1);
        assert!(!dir.path().join("ggml-tiny.bin.part").exists());
    }

    #[tokio::test]
    async fn non_success_status_yields_download_failed_and_no_cache_entry() {
        let server = testserver::spawn(ServerOptions {
            status_override: Some(503),
            ..Default::default()
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_models_dir(dir.path().to_path_buf(), None);
        let desc = descriptor(server.url.clone(), "");

        let err = manager.acquire_descriptor(desc, |_| {}).await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::DownloadFailed {
                status: Some(503),
                ..
            }
        ));
        let snap = manager.snapshot();
        assert!(snap.downloaded.is_empty());
        assert!(!snap.progress.contains_key("tiny"));
        assert!(!snap.downloading);
    }

    #[tokio::test]
    async fn checksum_mismatch_discards_the_artifact() {
        let server = testserver::spawn(ServerOptions {
            body: b"corrupt model bytes".to_vec(),
            ..Default::default()
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_models_dir(dir.path().to_path_buf(), None);
        let desc = descriptor(server.url.clone(), leak("0".repeat(64)));

        let err = manager.acquire_descriptor(desc, |_| {}).await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::DownloadFailed { status: None, .. }
        ));
        assert!(!dir.path().join("ggml-tiny.bin").exists());
        assert!(!dir.path().join("ggml-tiny.bin.part").exists());
        let snap = manager.snapshot();
        assert!(!snap.downloaded.contains_key("tiny"));
        assert!(!snap.progress.contains_key("tiny"));
    }

    #[tokio::test]
    async fn cancellation_keeps_the_partial_file_and_clears_state() {
        let server = testserver::spawn(ServerOptions {
            body: vec![7u8; 64 * 1024],
            chunk_delay: Some(Duration::from_millis(5)),
            ..Default::default()
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_models_dir(dir.path().to_path_buf(), None);
        let desc = descriptor(server.url.clone(), "");

        let err = manager
            .acquire_descriptor(desc, |p| {
                if p.fraction < 1.0 {
                    manager.cancel_download("tiny").unwrap();
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ManagerError::DownloadCancelled));
        assert!(dir.path().join("ggml-tiny.bin.part").exists());
        assert!(!dir.path().join("ggml-tiny.bin").exists());
        let snap = manager.snapshot();
        assert!(!snap.downloading);
        assert!(!snap.progress.contains_key("tiny"));
    }

    #[tokio::test]
    async fn resume_completes_a_cancelled_download() {
        let body: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 251) as u8).collect();
        let server = testserver::spawn(ServerOptions {
            body: body.clone(),
            chunk_delay: Some(Duration::from_millis(5)),
            ..Default::default()
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_models_dir(dir.path().to_path_buf(), None);
        let desc = descriptor(server.url.clone(), "");

        let err = manager
            .acquire_descriptor(desc, |p| {
                if p.fraction < 1.0 {
                    manager.cancel_download("tiny").unwrap();
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::DownloadCancelled));

        let part = dir.path().join("ggml-tiny.bin.part");
        let part_size = std::fs::metadata(&part).unwrap().len();
        assert!(part_size > 0 && part_size < body.len() as u64);

        let path = manager.acquire_descriptor(desc, |_| {}).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), body);
        assert_eq!(manager.snapshot().progress["tiny"], 1.0);
        assert_eq!(server.get_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_acquisitions_share_one_transfer() {
        let server = testserver::spawn(ServerOptions {
            body: vec![3u8; 32 * 1024],
            chunk_delay: Some(Duration::from_millis(5)),
            ..Default::default()
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::with_models_dir(dir.path().to_path_buf(), None);
        let desc = descriptor(server.url.clone(), "");

        let (a, b) = tokio::join!(
            manager.acquire_descriptor(desc, |_| {}),
            manager.acquire_descriptor(desc, |_| {}),
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(server.get_count(), 1);
    }
}
