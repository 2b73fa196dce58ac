//! Toolchain acquisition: download, verify, unpack, publish.
//!
//! ## Process
//!
//! 1. A non-empty `local_path` short-circuits everything: that directory is
//!    the toolchain root and no checksum is computed.
//! 2. An already published root for `(kind, version)` is reused.
//! 3. The archive is downloaded into a temporary file under `downloads/`.
//! 4. Its SHA256 is checked against the catalog. On mismatch the temporary
//!    file is deleted and nothing is published.
//! 5. The archive is unpacked into a staging directory next to the final
//!    location, its layout normalized and executables marked.
//! 6. The staging directory is renamed onto the final location. If another
//!    process published the same `(kind, version)` first, its copy wins and
//!    ours is discarded.
//!
//! Readers therefore only ever observe either no toolchain root or a
//! complete, verified one.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::archive::{ArchiveFormat, extract_archive, set_executable_permissions};
use super::catalog::SourceEntry;
use super::download::download_file;
use super::kind::ToolchainKind;
use super::layout::normalize_layout;
use super::paths::{ToolchainMetadata, ToolchainPaths};
use super::platform::Os;
use super::verify::verify_checksum;
use crate::errors::ToolchainError;

/// Where an acquired toolchain root came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The user supplied `local_path`.
    LocalPath,
    /// A previously published root was reused.
    Cache,
    /// The archive was downloaded and published by this call.
    Downloaded,
}

/// A usable toolchain root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub root: PathBuf,
    pub origin: Origin,
}

impl Acquired {
    /// Directory holding the compiler drivers.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }
}

/// What to acquire.
#[derive(Debug, Clone, Copy)]
pub struct AcquireRequest<'a> {
    pub kind: ToolchainKind,
    pub version: &'a str,
    pub build_os: Os,
    pub source: &'a SourceEntry,
}

/// Makes the requested toolchain available and returns its root.
///
/// # Errors
///
/// - [`ToolchainError::DownloadError`] when the transfer fails (not retried).
/// - [`ToolchainError::IntegrityError`] when the checksum does not match.
/// - [`ToolchainError::CatalogError`] when the URL has no recognised archive
///   extension (reported before any download).
/// - I/O errors from unpacking or publishing.
pub async fn acquire(
    paths: &ToolchainPaths,
    request: AcquireRequest<'_>,
    local_path: Option<&Path>,
) -> Result<Acquired> {
    if let Some(local) = local_path.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(use_local(local));
    }

    let AcquireRequest {
        kind,
        version,
        build_os,
        source,
    } = request;
    let final_dir = paths.toolchain_dir(kind, version);
    if final_dir.is_dir() {
        tracing::info!(root = %final_dir.display(), "toolchain already installed");
        return Ok(Acquired {
            root: final_dir,
            origin: Origin::Cache,
        });
    }

    let filename = source.filename();
    let format = ArchiveFormat::from_filename(filename).ok_or_else(|| {
        ToolchainError::catalog(format!(
            "cannot determine archive format of '{filename}' (expected .tar.xz, .tar.gz or .zip)"
        ))
    })?;

    paths.ensure_directories(kind)?;

    let archive = paths.download_file(filename)?;
    let bytes = download_file(&source.url, archive.path()).await?;
    tracing::debug!(bytes, path = %archive.path().display(), "download complete");

    // On mismatch `archive` is dropped here, deleting the unverified bytes.
    verify_checksum(archive.path(), &source.sha256)?;

    let staging = paths.staging_dir(kind)?;
    extract_archive(archive.path(), format, staging.path())?;
    drop(archive);

    normalize_layout(staging.path(), version, build_os)?;
    set_executable_permissions(staging.path())?;
    ToolchainPaths::write_metadata(
        staging.path(),
        &ToolchainMetadata::now(&source.url, source.sha256.to_lowercase()),
    )?;

    let origin = if publish(staging.path(), &final_dir)? {
        tracing::info!(root = %final_dir.display(), "toolchain installed");
        Origin::Downloaded
    } else {
        tracing::info!(root = %final_dir.display(), "toolchain was published concurrently, using it");
        Origin::Cache
    };
    drop(staging);

    Ok(Acquired {
        root: final_dir,
        origin,
    })
}

/// Uses an existing installation as the toolchain root without verification.
#[must_use]
pub fn use_local(path: &Path) -> Acquired {
    tracing::info!(path = %path.display(), "using local toolchain");
    if !path.join("bin").is_dir() {
        tracing::warn!(path = %path.display(), "local toolchain has no bin/ directory");
    }
    Acquired {
        root: path.to_path_buf(),
        origin: Origin::LocalPath,
    }
}

/// Renames `staging` onto `final_dir`.
///
/// Returns `false` when `final_dir` already exists, in which case `staging`
/// is left for the caller to discard.
fn publish(staging: &Path, final_dir: &Path) -> Result<bool> {
    match std::fs::rename(staging, final_dir) {
        Ok(()) => Ok(true),
        Err(_) if final_dir.is_dir() => Ok(false),
        Err(e) => Err(e).with_context(|| {
            format!(
                "Failed to publish {} to {}",
                staging.display(),
                final_dir.display()
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::archive::tests::write_tar_gz;
    use crate::toolchain::verify::compute_sha256;

    struct Fixture {
        _dir: tempfile::TempDir,
        paths: ToolchainPaths,
        source: SourceEntry,
        archive: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("gcc-arm-none-eabi.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("gcc-arm/bin/arm-none-eabi-gcc", b"#!/bin/sh\necho gcc\n"),
                ("gcc-arm/lib/gcc/libgcc.a", b"archive"),
            ],
        );
        let sha256 = compute_sha256(&archive).unwrap();
        let source = SourceEntry {
            url: format!("file://{}", archive.display()),
            sha256,
        };
        let paths = ToolchainPaths::with_root(dir.path().join("home"));
        Fixture {
            _dir: dir,
            paths,
            source,
            archive,
        }
    }

    fn request(source: &SourceEntry) -> AcquireRequest<'_> {
        AcquireRequest {
            kind: ToolchainKind::ArmNoneEabi,
            version: "14",
            build_os: Os::Linux,
            source,
        }
    }

    fn leftover_downloads(paths: &ToolchainPaths) -> usize {
        std::fs::read_dir(&paths.downloads).map_or(0, Iterator::count)
    }

    #[tokio::test]
    async fn downloads_verifies_and_publishes() {
        let f = fixture();

        let acquired = acquire(&f.paths, request(&f.source), None).await.unwrap();

        assert_eq!(acquired.origin, Origin::Downloaded);
        assert_eq!(
            acquired.root,
            f.paths.toolchain_dir(ToolchainKind::ArmNoneEabi, "14")
        );
        assert!(acquired.bin_dir().join("arm-none-eabi-gcc").is_file());
        let meta = f
            .paths
            .read_metadata(ToolchainKind::ArmNoneEabi, "14")
            .unwrap();
        assert_eq!(meta.sha256, f.source.sha256);
        assert_eq!(leftover_downloads(&f.paths), 0);
    }

    #[tokio::test]
    async fn second_acquire_reuses_published_root() {
        let f = fixture();
        acquire(&f.paths, request(&f.source), None).await.unwrap();

        let unreachable = SourceEntry {
            url: "file:///nonexistent/archive.tar.gz".to_string(),
            sha256: f.source.sha256.clone(),
        };
        let again = acquire(&f.paths, request(&unreachable), None).await.unwrap();
        assert_eq!(again.origin, Origin::Cache);
    }

    #[tokio::test]
    async fn corrupted_artifact_fails_and_publishes_nothing() {
        let f = fixture();
        let mut bytes = std::fs::read(&f.archive).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xff;
        std::fs::write(&f.archive, bytes).unwrap();

        let err = acquire(&f.paths, request(&f.source), None).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ToolchainError>(),
            Some(ToolchainError::IntegrityError { .. })
        ));
        assert!(!f.paths.is_installed(ToolchainKind::ArmNoneEabi, "14"));
        assert!(f.paths.list_installed().unwrap().is_empty());
        assert_eq!(leftover_downloads(&f.paths), 0);
        let staging_left = std::fs::read_dir(f.paths.kind_dir(ToolchainKind::ArmNoneEabi))
            .unwrap()
            .count();
        assert_eq!(staging_left, 0);
    }

    #[tokio::test]
    async fn local_path_skips_download_and_verification() {
        let f = fixture();
        let local = f.paths.root.join("my-gcc");
        std::fs::create_dir_all(local.join("bin")).unwrap();

        let bogus = SourceEntry {
            url: "https://unreachable.invalid/gcc.tar.xz".to_string(),
            sha256: "0".repeat(64),
        };
        let acquired = acquire(&f.paths, request(&bogus), Some(&local))
            .await
            .unwrap();

        assert_eq!(acquired.origin, Origin::LocalPath);
        assert_eq!(acquired.root, local);
        assert!(!f.paths.toolchains.exists());
    }

    #[tokio::test]
    async fn empty_local_path_means_download() {
        let f = fixture();
        let acquired = acquire(&f.paths, request(&f.source), Some(Path::new("")))
            .await
            .unwrap();
        assert_eq!(acquired.origin, Origin::Downloaded);
    }

    #[tokio::test]
    async fn unknown_archive_extension_fails_before_download() {
        let f = fixture();
        let source = SourceEntry {
            url: "https://unreachable.invalid/gcc.pkg".to_string(),
            sha256: "0".repeat(64),
        };
        let err = acquire(&f.paths, request(&source), None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ToolchainError>(),
            Some(ToolchainError::CatalogError { .. })
        ));
        assert!(!f.paths.downloads.exists());
    }

    #[test]
    fn publish_yields_to_existing_root() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(".staging-1");
        let final_dir = dir.path().join("14");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("ours"), b"").unwrap();
        std::fs::create_dir_all(&final_dir).unwrap();
        std::fs::write(final_dir.join("theirs"), b"").unwrap();

        assert!(!publish(&staging, &final_dir).unwrap());
        assert!(final_dir.join("theirs").exists());
        assert!(!final_dir.join("ours").exists());
    }

    #[test]
    fn publish_moves_staging_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(".staging-1");
        let final_dir = dir.path().join("14");
        std::fs::create_dir_all(staging.join("bin")).unwrap();

        assert!(publish(&staging, &final_dir).unwrap());
        assert!(final_dir.join("bin").is_dir());
        assert!(!staging.exists());
    }
}
