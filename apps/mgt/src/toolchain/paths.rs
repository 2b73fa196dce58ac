//! Path management for the toolchain cache.
//!
//! The default root directory is `~/.mgt/` (`%APPDATA%\mgt` on Windows),
//! overridable with the `MGT_HOME` environment variable.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/.mgt/                       # Root directory (or MGT_HOME)
//!   catalog.toml                # Default catalog location
//!   toolchains/
//!     arm-none-eabi/
//!       14/                     # Published toolchain root for (kind, version)
//!         bin/
//!         .metadata.json        # Source URL, checksum and install date
//!       .staging-XXXXXX/        # In-progress unpack, renamed into place when complete
//!     native/
//!       14/
//!   downloads/                  # Unverified archives (temporary files only)
//! ```
//!
//! A directory under `toolchains/<kind>/` whose name does not start with a
//! dot only ever appears through a single `rename` of a fully verified and
//! unpacked staging directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::kind::ToolchainKind;

/// Environment variable to override the default root directory.
pub const MGT_HOME_ENV: &str = "MGT_HOME";

/// Metadata file name stored in each published toolchain root.
const METADATA_FILE: &str = ".metadata.json";

/// Name prefix of staging directories.
const STAGING_PREFIX: &str = ".staging-";

/// Metadata about a published toolchain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolchainMetadata {
    /// URL the archive was downloaded from.
    pub url: String,
    /// Verified SHA256 of the archive.
    pub sha256: String,
    /// UTC date the toolchain was published (YYYY-MM-DD).
    pub installed_at: String,
}

impl ToolchainMetadata {
    /// Creates metadata stamped with today's UTC date.
    #[must_use = "returns new metadata without side effects"]
    pub fn now(url: impl Into<String>, sha256: impl Into<String>) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        Self {
            url: url.into(),
            sha256: sha256.into(),
            installed_at: format_date(secs / 86_400),
        }
    }
}

/// Formats days since the Unix epoch as `YYYY-MM-DD` (proleptic Gregorian).
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn format_date(days: u64) -> String {
    let z = days as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    format!("{year:04}-{month:02}-{day:02}")
}

/// An installed toolchain found in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledToolchain {
    pub kind: ToolchainKind,
    pub version: String,
    pub root: PathBuf,
}

/// Manages paths for toolchain installations.
#[derive(Debug, Clone)]
pub struct ToolchainPaths {
    /// Root directory for all data (`~/.mgt` or `MGT_HOME`).
    pub root: PathBuf,
    /// Directory containing one subdirectory per toolchain kind.
    pub toolchains: PathBuf,
    /// Directory for temporary downloads.
    pub downloads: PathBuf,
}

impl ToolchainPaths {
    /// Creates a new `ToolchainPaths` instance.
    ///
    /// The root directory is determined by:
    /// 1. The `MGT_HOME` environment variable if set
    /// 2. On Windows: `%APPDATA%\mgt`
    /// 3. On Unix: `~/.mgt`
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let root = if let Ok(home) = std::env::var(MGT_HOME_ENV) {
            PathBuf::from(home)
        } else {
            #[cfg(windows)]
            {
                dirs::data_dir()
                    .context("Cannot determine AppData directory. Set MGT_HOME environment variable.")?
                    .join("mgt")
            }
            #[cfg(not(windows))]
            {
                dirs::home_dir()
                    .context("Cannot determine home directory. Set MGT_HOME environment variable.")?
                    .join(".mgt")
            }
        };

        Ok(Self::with_root(root))
    }

    /// Creates a new `ToolchainPaths` instance with a specific root directory.
    #[must_use = "returns new paths instance without side effects"]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            toolchains: root.join("toolchains"),
            downloads: root.join("downloads"),
            root,
        }
    }

    /// Directory holding every published version of one kind.
    #[must_use = "returns the path without side effects"]
    pub fn kind_dir(&self, kind: ToolchainKind) -> PathBuf {
        self.toolchains.join(kind.as_str())
    }

    /// Published toolchain root for `(kind, version)`.
    #[must_use = "returns the path without side effects"]
    pub fn toolchain_dir(&self, kind: ToolchainKind, version: &str) -> PathBuf {
        self.kind_dir(kind).join(version)
    }

    /// Checks whether `(kind, version)` has been published.
    #[must_use = "returns installation status without side effects"]
    pub fn is_installed(&self, kind: ToolchainKind, version: &str) -> bool {
        self.toolchain_dir(kind, version).is_dir()
    }

    /// Ensures the root, kind and download directories exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_directories(&self, kind: ToolchainKind) -> Result<()> {
        for dir in [&self.root, &self.downloads, &self.kind_dir(kind)] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Creates a fresh staging directory next to the published roots of `kind`.
    ///
    /// Being on the same filesystem as the final location makes the publishing
    /// `rename` atomic. The directory is removed when the handle is dropped
    /// unless it has been renamed away.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn staging_dir(&self, kind: ToolchainKind) -> Result<tempfile::TempDir> {
        let parent = self.kind_dir(kind);
        tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&parent)
            .with_context(|| format!("Failed to create staging directory in {}", parent.display()))
    }

    /// Creates a temporary file for an unverified download.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn download_file(&self, filename: &str) -> Result<tempfile::NamedTempFile> {
        tempfile::Builder::new()
            .prefix(".partial-")
            .suffix(&format!("-{filename}"))
            .tempfile_in(&self.downloads)
            .with_context(|| format!("Failed to create download file in {}", self.downloads.display()))
    }

    /// Path of the metadata file inside a toolchain root.
    #[must_use = "returns the path without side effects"]
    pub fn metadata_path(root: &Path) -> PathBuf {
        root.join(METADATA_FILE)
    }

    /// Writes metadata into a (staging or published) toolchain root.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata file cannot be written.
    pub fn write_metadata(root: &Path, metadata: &ToolchainMetadata) -> Result<()> {
        let path = Self::metadata_path(root);
        let content =
            serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write metadata to {}", path.display()))
    }

    /// Reads metadata for a published toolchain, if present and well-formed.
    #[must_use]
    pub fn read_metadata(&self, kind: ToolchainKind, version: &str) -> Option<ToolchainMetadata> {
        let path = Self::metadata_path(&self.toolchain_dir(kind, version));
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Lists published toolchains, sorted by kind then version.
    ///
    /// Staging directories and unknown kind directories are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a kind directory exists but cannot be read.
    pub fn list_installed(&self) -> Result<Vec<InstalledToolchain>> {
        let mut installed = Vec::new();
        for kind in ToolchainKind::ALL {
            let dir = self.kind_dir(kind);
            if !dir.is_dir() {
                continue;
            }
            let entries = std::fs::read_dir(&dir)
                .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
            for entry in entries {
                let entry = entry.with_context(|| "Failed to read directory entry")?;
                let path = entry.path();
                if path.is_dir()
                    && let Some(name) = path.file_name().and_then(|n| n.to_str())
                    && !name.starts_with('.')
                {
                    installed.push(InstalledToolchain {
                        kind,
                        version: name.to_string(),
                        root: path.clone(),
                    });
                }
            }
        }
        installed.sort_by(|a, b| (a.kind, &a.version).cmp(&(b.kind, &b.version)));
        Ok(installed)
    }
}
