//! Source resolution: `(version, kind, build platform)` -> `(url, sha256)`.
//!
//! Resolution is a pure catalog lookup. Every reason a toolchain cannot be
//! provided for a platform is reported here, before any network activity.

use super::catalog::{Catalog, SourceEntry};
use super::kind::ToolchainKind;
use super::platform::Platform;
use crate::errors::ToolchainError;

/// Resolves the download source for a toolchain.
///
/// `build_os` and `build_arch` use Conan setting spellings (`Linux`,
/// `x86_64`, ...).
///
/// # Errors
///
/// - [`ToolchainError::UnknownVersion`] if `version` is not in the catalog.
/// - [`ToolchainError::UnsupportedCombination`] if the build OS or
///   architecture is unknown, the version does not ship `kind` at all, or the
///   `(kind, os, arch)` cell is empty.
pub fn resolve_source<'c>(
    catalog: &'c Catalog,
    version: &str,
    kind: ToolchainKind,
    build_os: &str,
    build_arch: &str,
) -> Result<&'c SourceEntry, ToolchainError> {
    catalog.version(version)?;
    let platform = Platform::parse(build_os, build_arch)?;
    resolve_for_platform(catalog, version, kind, platform)
}

/// Same as [`resolve_source`] with an already parsed platform.
///
/// # Errors
///
/// See [`resolve_source`].
pub fn resolve_for_platform<'c>(
    catalog: &'c Catalog,
    version: &str,
    kind: ToolchainKind,
    platform: Platform,
) -> Result<&'c SourceEntry, ToolchainError> {
    ensure_kind(catalog, version, kind)?;

    let Some(entry) = catalog.source(version, kind, platform)? else {
        let platforms: Vec<_> = catalog
            .platforms(version, kind)?
            .iter()
            .map(ToString::to_string)
            .collect();
        return Err(ToolchainError::unsupported(format!(
            "no prebuilt {kind} toolchain {version} for build platform {platform}; \
             available for: {}. Choose a supported platform or set the local_path option.",
            platforms.join(", ")
        )));
    };

    tracing::debug!(version, %kind, %platform, url = %entry.url, "resolved source");
    Ok(entry)
}

/// Checks that `version` ships the `kind` toolchain for at least one platform.
///
/// # Errors
///
/// Returns [`ToolchainError::UnknownVersion`] or
/// [`ToolchainError::UnsupportedCombination`].
pub fn ensure_kind(
    catalog: &Catalog,
    version: &str,
    kind: ToolchainKind,
) -> Result<(), ToolchainError> {
    let kinds = catalog.kinds(version)?;
    if kinds.contains(&kind) {
        return Ok(());
    }
    let available: Vec<_> = kinds.iter().map(|k| k.as_str()).collect();
    Err(ToolchainError::unsupported(format!(
        "version {version} does not provide the '{kind}' toolchain (available: {})",
        available.join(", ")
    )))
}
