// Artifact integrity check. Catalog digests are optional; an empty digest
// skips verification, a mismatch is a download failure.

use crate::error::{ManagerError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

pub fn calculate_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| ManagerError::transport(format!("open {:?} for checksum: {}", path, e)))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .map_err(|e| ManagerError::transport(format!("read {:?} for checksum: {}", path, e)))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare a file against an expected hex digest, case-insensitively.
pub fn verify_sha256(path: &Path, expected: &str) -> Result<()> {
    if expected.is_empty() {
        log::warn!("No pinned digest for {:?}, skipping verification", path);
        return Ok(());
    }
    let actual = calculate_sha256(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ManagerError::transport(format!(
            "checksum mismatch for {:?}: expected {}, got {}",
            path, expected, actual
        )));
    }
    log::info!("Checksum verified for {:?}", path);
    Ok(())
}
