//! SHA256 verification of downloaded archives.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::errors::ToolchainError;

/// Verifies that a file hashes to the expected SHA256 checksum.
///
/// The comparison ignores hex case.
///
/// # Errors
///
/// Returns an error if the file cannot be read, or
/// [`ToolchainError::IntegrityError`] if the digest does not match.
pub fn verify_checksum(file_path: &Path, expected: &str) -> Result<()> {
    let computed = compute_sha256(file_path)?;

    if !computed.eq_ignore_ascii_case(expected) {
        return Err(ToolchainError::integrity(file_path, expected.to_lowercase(), computed).into());
    }

    tracing::debug!(path = %file_path.display(), sha256 = %computed, "checksum verified");
    Ok(())
}

/// Computes the SHA256 hash of a file as a lowercase hex string.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open file for checksum: {}", file_path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let bytes_read = file.read(&mut buffer).with_context(|| {
            format!("Failed to read file for checksum: {}", file_path.display())
        })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
