// Failure taxonomy for model acquisition and engine lifecycle.
// Tauri commands flatten these to strings at the IPC boundary; everything
// inside the crate keeps the typed variants so callers can branch on them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    /// The platform data root could not be resolved or the models
    /// directory could not be created. Fatal to any model operation.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Caller passed a model id that is not in the catalog.
    #[error("unknown model id: {0}")]
    UnknownModel(String),

    /// Transfer ended with a non-success status, a transport error, or a
    /// checksum mismatch. Recoverable by re-invoking the download.
    #[error("download failed ({}): {reason}", .status.map(|s| s.to_string()).unwrap_or_else(|| String::from("transport")))]
    DownloadFailed { status: Option<u16>, reason: String },

    /// The caller aborted an in-flight transfer. The partial file is kept
    /// for a later resume.
    #[error("download cancelled")]
    DownloadCancelled,

    /// No native inference backend is compiled into or available in this
    /// runtime. Feature-disable, not a crash.
    #[error("speech engine is not available in this runtime")]
    EngineUnavailable,

    /// A present backend failed to load the model file.
    #[error("engine initialization failed: {0}")]
    EngineInitFailed(String),

    /// Secondary VAD context could not be created. Soft failure; the
    /// primary engine handle stays valid.
    #[error("VAD initialization failed: {0}")]
    VadInitFailed(String),

    /// Backing file removal failed. The file-info cache is re-synced with
    /// whatever is actually on disk.
    #[error("failed to delete model file: {0}")]
    DeleteFailed(String),
}

impl ManagerError {
    pub fn download_failed(status: u16, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            status: Some(status),
            reason: reason.into(),
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            status: None,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
