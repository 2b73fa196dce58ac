//! Post-extraction fixups for toolchain archives with a non-standard layout.
//!
//! Native GCC builds for macOS unpack into a versioned folder
//! (`14.2.0/bin/gcc-14`, ...) instead of putting `bin/` at the root, and name
//! their drivers with a major-version suffix. After [`normalize_layout`] the
//! root looks like every other toolchain: `bin/gcc`, `bin/g++`, ...

use std::path::Path;

use anyhow::{Context, Result};

use super::platform::Os;

/// Normalizes an unpacked toolchain root in place.
///
/// Only applies to macOS build machines and only when `bin/` is missing at
/// the root. Other layouts are left untouched.
///
/// # Errors
///
/// Returns an error if entries cannot be moved or the directory cannot be read.
pub fn normalize_layout(root: &Path, version: &str, build_os: Os) -> Result<()> {
    if build_os != Os::Macos || root.join("bin").exists() {
        return Ok(());
    }

    hoist_versioned_folder(root, version)?;
    link_unversioned_tools(&root.join("bin"), major_version(version));
    Ok(())
}

/// `"14.2.0"` -> `"14"`.
fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Moves the contents of the first directory named `<version>*` up to `root`.
fn hoist_versioned_folder(root: &Path, version: &str) -> Result<()> {
    let mut candidates: Vec<_> = std::fs::read_dir(root)
        .with_context(|| format!("Failed to read directory: {}", root.display()))?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(version))
        })
        .collect();
    candidates.sort();

    let Some(versioned) = candidates.into_iter().next() else {
        return Ok(());
    };

    tracing::info!(from = %versioned.display(), "moving versioned folder contents to toolchain root");
    for entry in std::fs::read_dir(&versioned)
        .with_context(|| format!("Failed to read directory: {}", versioned.display()))?
    {
        let entry = entry.context("Failed to read directory entry")?;
        let target = root.join(entry.file_name());
        std::fs::rename(entry.path(), &target).with_context(|| {
            format!(
                "Failed to move {} to {}",
                entry.path().display(),
                target.display()
            )
        })?;
    }
    std::fs::remove_dir(&versioned)
        .with_context(|| format!("Failed to remove {}", versioned.display()))?;
    Ok(())
}

/// Adds `gcc` -> `gcc-14` style symlinks in `bin_dir`.
///
/// Failures are logged and skipped; a missing alias does not invalidate the
/// toolchain.
#[cfg(unix)]
fn link_unversioned_tools(bin_dir: &Path, major: &str) {
    let suffix = format!("-{major}");
    let Ok(entries) = std::fs::read_dir(bin_dir) else {
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(alias) = name.strip_suffix(&suffix) else {
            continue;
        };
        let link = bin_dir.join(alias);
        if link.exists() {
            continue;
        }
        match std::os::unix::fs::symlink(name, &link) {
            Ok(()) => tracing::debug!(alias, target = name, "created symlink"),
            Err(e) => tracing::warn!(alias, target = name, error = %e, "failed to create symlink"),
        }
    }
}

#[cfg(not(unix))]
fn link_unversioned_tools(_bin_dir: &Path, _major: &str) {}
