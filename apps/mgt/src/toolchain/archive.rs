//! Archive extraction for prebuilt toolchain distributions.
//!
//! GCC distributions ship as `.tar.xz` (Linux, macOS), `.tar.gz` and `.zip`
//! (Windows). All of them wrap their content in a single top-level folder
//! such as `arm-gnu-toolchain-14.2.rel1-x86_64-arm-none-eabi/`; when every
//! entry shares such a folder it is stripped so `bin/` lands directly in the
//! destination.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use tar::Archive;
use xz2::read::XzDecoder;

/// Supported archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarXz,
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Detects the format from a file name's extension.
    #[must_use]
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
            Some(Self::TarXz)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// Extracts an archive of the given format into `dest_dir`.
///
/// Creates `dest_dir` if needed and strips a common root folder.
///
/// # Errors
///
/// Returns an error if the archive cannot be read, contains an absolute or
/// `..` path, or a file cannot be written.
pub fn extract_archive(archive_path: &Path, format: ArchiveFormat, dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    tracing::debug!(
        archive = %archive_path.display(),
        dest = %dest_dir.display(),
        ?format,
        "extracting"
    );

    match format {
        ArchiveFormat::TarXz | ArchiveFormat::TarGz => extract_tar(archive_path, format, dest_dir),
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir),
    }
}

fn open_tar(archive_path: &Path, format: ArchiveFormat) -> Result<Archive<Box<dyn Read>>> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let reader = BufReader::new(file);
    let decoder: Box<dyn Read> = match format {
        ArchiveFormat::TarXz => Box::new(XzDecoder::new(reader)),
        ArchiveFormat::TarGz => Box::new(GzDecoder::new(reader)),
        ArchiveFormat::Zip => bail!("{} is not a tar archive", archive_path.display()),
    };
    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(true);
    Ok(archive)
}

/// Extracts a compressed tar archive.
///
/// GCC distributions alias drivers with symlinks and hard links. Symlinks are
/// recreated as long as they stay inside the toolchain root. Hard-link targets
/// are archive paths, so they are mapped below `dest_dir` like any entry.
fn extract_tar(archive_path: &Path, format: ArchiveFormat, dest_dir: &Path) -> Result<()> {
    let strip_prefix = {
        let mut archive = open_tar(archive_path, format)?;
        let mut paths = Vec::new();
        for entry in archive
            .entries()
            .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
        {
            let entry = entry
                .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;
            paths.push(entry.path().context("Failed to get entry path")?.into_owned());
        }
        common_root(paths.iter().map(PathBuf::as_path))
    };

    let mut archive = open_tar(archive_path, format)?;
    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let mut entry = entry
            .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;
        let entry_path = entry.path().context("Failed to get entry path")?.into_owned();
        reject_escaping_path(&entry_path)?;

        let Some(relative_path) = relative_to_root(&entry_path, strip_prefix.as_deref()) else {
            continue;
        };
        let output_path = dest_dir.join(&relative_path);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        if entry_type.is_hard_link() {
            let target = link_target(&entry, &entry_path)?;
            reject_escaping_path(&target)?;
            let Some(target_relative) = relative_to_root(&target, strip_prefix.as_deref()) else {
                bail!("Hard link {} points at the archive root", entry_path.display());
            };
            let source = dest_dir.join(target_relative);
            std::fs::hard_link(&source, &output_path).with_context(|| {
                format!(
                    "Failed to hard link {} to {}",
                    output_path.display(),
                    source.display()
                )
            })?;
            continue;
        }

        if entry_type.is_symlink() {
            let target = link_target(&entry, &entry_path)?;
            reject_escaping_symlink(&relative_path, &target)?;
        }

        entry
            .unpack(&output_path)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
    }

    Ok(())
}

fn link_target<R: Read>(entry: &tar::Entry<'_, R>, entry_path: &Path) -> Result<PathBuf> {
    entry
        .link_name()
        .with_context(|| format!("Failed to read link target of {}", entry_path.display()))?
        .map(std::borrow::Cow::into_owned)
        .with_context(|| format!("Link entry has no target: {}", entry_path.display()))
}

/// Extracts a ZIP archive, restoring Unix permission bits when recorded.
fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Failed to read ZIP archive: {}", archive_path.display()))?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;
        let Some(path) = entry.enclosed_name() else {
            bail!(
                "Refusing to extract path with parent directory or absolute reference: {}",
                entry.name()
            );
        };
        names.push(path);
    }
    let strip_prefix = common_root(names.iter().map(PathBuf::as_path));

    for (i, entry_path) in names.iter().enumerate() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;
        reject_escaping_path(entry_path)?;

        let Some(relative_path) = relative_to_root(entry_path, strip_prefix.as_deref()) else {
            continue;
        };
        let output_path = dest_dir.join(&relative_path);

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut outfile = File::create(&output_path)
            .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
        std::io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&output_path, std::fs::Permissions::from_mode(mode & 0o7777))
                .with_context(|| format!("Failed to set permissions: {}", output_path.display()))?;
        }
    }

    Ok(())
}

/// Rejects absolute paths and `..` components (path traversal).
fn reject_escaping_path(path: &Path) -> Result<()> {
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        bail!(
            "Refusing to extract path with parent directory or absolute reference: {}",
            path.display()
        );
    }
    Ok(())
}

/// Rejects a symlink at `link` (relative to the root) whose target resolves
/// above the root or is absolute.
fn reject_escaping_symlink(link: &Path, target: &Path) -> Result<()> {
    let mut depth = link.parent().map_or(0, |parent| normalize(parent).components().count());
    for component in target.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(_) => depth += 1,
            Component::ParentDir if depth > 0 => depth -= 1,
            _ => bail!(
                "Refusing to extract symlink {} pointing outside the toolchain: {}",
                link.display(),
                target.display()
            ),
        }
    }
    Ok(())
}

/// Drops `.` components so `./root/bin` and `root/bin` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Maps an entry path below the stripped root. `None` means the entry is the
/// root folder itself (or `./`).
fn relative_to_root(entry_path: &Path, strip_prefix: Option<&Path>) -> Option<PathBuf> {
    let path = normalize(entry_path);
    let relative = strip_prefix
        .and_then(|prefix| path.strip_prefix(prefix).ok())
        .map_or_else(|| path.clone(), Path::to_path_buf);
    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// Finds a folder shared by every entry.
///
/// Only reported when at least one entry is nested below it, so an archive of
/// flat files is never mistaken for a wrapped one. Entries that name the
/// archive root itself (`./`) are ignored.
fn common_root<'a>(paths: impl Iterator<Item = &'a Path>) -> Option<PathBuf> {
    let mut root: Option<PathBuf> = None;
    let mut has_nested_entries = false;

    for path in paths {
        let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));
        let Some(first) = components.next() else {
            continue;
        };
        let first = PathBuf::from(first.as_os_str());
        if components.next().is_some() {
            has_nested_entries = true;
        }
        match &root {
            None => root = Some(first),
            Some(existing) if existing != &first => return None,
            Some(_) => {}
        }
    }

    root.filter(|_| has_nested_entries)
}

/// Marks every regular file in `<dir>/bin` executable (Unix only).
///
/// # Errors
///
/// Returns an error if the bin directory cannot be read or a permission
/// change fails.
#[cfg(unix)]
pub fn set_executable_permissions(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let bin_dir = dir.join("bin");
    if !bin_dir.is_dir() {
        return Ok(());
    }

    let entries = std::fs::read_dir(&bin_dir)
        .with_context(|| format!("Failed to read bin directory: {}", bin_dir.display()))?;
    for entry in entries {
        let path = entry.context("Failed to read directory entry")?.path();
        let metadata = std::fs::symlink_metadata(&path)
            .with_context(|| format!("Failed to get metadata: {}", path.display()))?;
        if !metadata.is_file() {
            continue;
        }
        let mut perms = metadata.permissions();
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("Failed to set permissions: {}", path.display()))?;
    }

    Ok(())
}

/// Sets executable permissions (no-op on Windows).
#[cfg(windows)]
#[allow(clippy::unnecessary_wraps)]
pub fn set_executable_permissions(_dir: &Path) -> Result<()> {
    Ok(())
}
