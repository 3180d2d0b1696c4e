// Seam to the native inference engine. The manager only sees these traits;
// the whisper.cpp implementation is compiled in behind the `whisper-cpp`
// feature. `native_backend()` is the availability probe; `None` means
// the capability is absent in this runtime, not an error.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Opaque handle to an initialized native context.
pub trait EngineHandle: Send {
    /// Release the native resources behind the handle.
    fn release(self: Box<Self>) -> Result<()>;
}

/// Factory for native engine and VAD contexts.
pub trait EngineBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Initialize a transcription context from a local model file.
    fn init(&self, model_path: &Path) -> Result<Box<dyn EngineHandle>>;

    /// Initialize a secondary voice-activity-detection context from the
    /// same model file. Callers treat failure as non-fatal.
    fn init_vad(&self, model_path: &Path) -> Result<Box<dyn EngineHandle>>;
}

/// Probe for the native backend compiled into this build.
#[cfg(feature = "whisper-cpp")]
pub fn native_backend() -> Option<Arc<dyn EngineBackend>> {
    Some(Arc::new(whisper::WhisperBackend))
}

#[cfg(not(feature = "whisper-cpp"))]
pub fn native_backend() -> Option<Arc<dyn EngineBackend>> {
    None
}

#[cfg(feature = "whisper-cpp")]
mod whisper {
    use super::{EngineBackend, EngineHandle};
    use anyhow::{anyhow, Context, Result};
    use std::path::Path;
    use whisper_rs::{WhisperContext, WhisperContextParameters};

    pub struct WhisperBackend;

    struct WhisperHandle {
        #[allow(dead_code)]
        context: WhisperContext,
    }

    impl EngineHandle for WhisperHandle {
        fn release(self: Box<Self>) -> Result<()> {
            // WhisperContext frees the native state on drop.
            drop(self);
            Ok(())
        }
    }

    fn load_context(model_path: &Path) -> Result<WhisperContext> {
        let path = model_path
            .to_str()
            .ok_or_else(|| anyhow!("model path is not valid UTF-8: {:?}", model_path))?;
        WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| anyhow!("whisper context creation failed: {:?}", e))
    }

    impl EngineBackend for WhisperBackend {
        fn name(&self) -> &'static str {
            "whisper.cpp"
        }

        fn init(&self, model_path: &Path) -> Result<Box<dyn EngineHandle>> {
            let context = load_context(model_path)
                .with_context(|| format!("loading model from {:?}", model_path))?;
            Ok(Box::new(WhisperHandle { context }))
        }

        fn init_vad(&self, model_path: &Path) -> Result<Box<dyn EngineHandle>> {
            // Secondary context over the same weights, kept independent of
            // the transcription context's state.
            let context = load_context(model_path)
                .with_context(|| format!("loading VAD context from {:?}", model_path))?;
            Ok(Box::new(WhisperHandle { context }))
        }
    }
}
