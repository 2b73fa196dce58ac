//! Toolchain catalog: versions, download sources and per-version defaults.
//!
//! The catalog is a TOML document read once at startup and validated into an
//! immutable [`Catalog`] that is passed explicitly to everything that needs it.
//!
//! ## Catalog Format
//!
//! ```toml
//! [defaults]
//! lto = true
//!
//! [versions."14"]
//! source = "14.2.rel1"
//! lto_default = { native = false, arm-none-eabi = false }
//!
//! [sources."14.2.rel1".arm-none-eabi.Linux.x86_64]
//! url = "https://developer.arm.com/.../arm-gnu-toolchain-14.2.rel1-x86_64-arm-none-eabi.tar.xz"
//! sha256 = "..."
//! ```
//!
//! `versions` maps a user-facing version string to a key of the `sources`
//! table. Each leaf of `sources` is indexed by toolchain kind, build OS and
//! build architecture. A leaf with an empty `url` or a malformed `sha256` is a
//! configuration error and is reported when the catalog is loaded, never
//! during a download.
//!
//! ## Location
//!
//! The catalog path is taken from `--catalog`, then the `MGT_CATALOG`
//! environment variable, then `catalog.toml` in the mgt home directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::kind::ToolchainKind;
use super::paths::ToolchainPaths;
use super::platform::{Arch, Os, Platform};
use crate::errors::ToolchainError;

/// Environment variable naming the catalog file.
pub const CATALOG_ENV: &str = "MGT_CATALOG";

/// Catalog file name inside the mgt home directory.
const CATALOG_FILE: &str = "catalog.toml";

/// Download location and checksum of one prebuilt archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SourceEntry {
    /// Download URL for the archive (`https://`, `http://` or `file://`).
    pub url: String,
    /// SHA256 checksum of the archive as a hex string.
    pub sha256: String,
}

impl SourceEntry {
    /// Extracts the archive file name from the URL (last path segment).
    ///
    /// Example: `".../arm-gnu-toolchain-14.2.rel1-x86_64-arm-none-eabi.tar.xz"`
    /// -> `"arm-gnu-toolchain-14.2.rel1-x86_64-arm-none-eabi.tar.xz"`
    #[must_use]
    pub fn filename(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

/// Version entry as written in the catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVersion {
    source: String,
    #[serde(default)]
    lto_default: BTreeMap<String, bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefaults {
    #[serde(default = "default_lto")]
    lto: bool,
}

impl Default for RawDefaults {
    fn default() -> Self {
        Self { lto: default_lto() }
    }
}

fn default_lto() -> bool {
    true
}

type RawSources = BTreeMap<String, BTreeMap<String, BTreeMap<String, SourceEntry>>>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCatalog {
    #[serde(default)]
    defaults: RawDefaults,
    versions: BTreeMap<String, RawVersion>,
    sources: BTreeMap<String, RawSources>,
}

/// A validated catalog version.
#[derive(Debug, Clone)]
pub struct VersionEntry {
    /// Key into the source table.
    pub source: String,
    lto_default: BTreeMap<ToolchainKind, bool>,
}

/// The immutable, validated toolchain catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    default_lto: bool,
    versions: BTreeMap<String, VersionEntry>,
    sources: BTreeMap<String, BTreeMap<(ToolchainKind, Os, Arch), SourceEntry>>,
}

impl Catalog {
    /// Returns the catalog path to use, honoring an explicit path first.
    #[must_use]
    pub fn locate(explicit: Option<&Path>, paths: &ToolchainPaths) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(CATALOG_ENV)
            && !path.is_empty()
        {
            return PathBuf::from(path);
        }
        paths.root.join(CATALOG_FILE)
    }

    /// Reads and validates a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read catalog {}. Pass --catalog or set {CATALOG_ENV}.",
                path.display()
            )
        })?;
        let catalog = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid catalog {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            versions = catalog.versions.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Parses and validates a catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::CatalogError`] for malformed TOML, unknown
    /// kind/OS/architecture keys, empty URLs or checksums, and versions that
    /// point at a missing source table.
    pub fn from_toml_str(content: &str) -> Result<Self, ToolchainError> {
        let raw: RawCatalog =
            toml::from_str(content).map_err(|e| ToolchainError::catalog(e.to_string()))?;

        let mut sources = BTreeMap::new();
        for (key, kinds) in raw.sources {
            let mut table = BTreeMap::new();
            for (kind_name, oses) in kinds {
                let kind = parse_key::<ToolchainKind>(&kind_name, &key)?;
                for (os_name, arches) in oses {
                    let os = parse_key::<Os>(&os_name, &key)?;
                    for (arch_name, entry) in arches {
                        let arch = parse_key::<Arch>(&arch_name, &key)?;
                        validate_entry(&entry, &key, kind, os, arch)?;
                        table.insert((kind, os, arch), entry);
                    }
                }
            }
            sources.insert(key, table);
        }

        let mut versions = BTreeMap::new();
        for (version, entry) in raw.versions {
            if !sources.contains_key(&entry.source) {
                return Err(ToolchainError::catalog(format!(
                    "version '{version}' refers to source table '{}', which is not defined",
                    entry.source
                )));
            }
            let mut lto_default = BTreeMap::new();
            for (kind_name, enabled) in entry.lto_default {
                let kind = kind_name.parse::<ToolchainKind>().map_err(|_| {
                    ToolchainError::catalog(format!(
                        "version '{version}': lto_default names unknown kind '{kind_name}'"
                    ))
                })?;
                lto_default.insert(kind, enabled);
            }
            versions.insert(
                version,
                VersionEntry {
                    source: entry.source,
                    lto_default,
                },
            );
        }

        Ok(Self {
            default_lto: raw.defaults.lto,
            versions,
            sources,
        })
    }

    /// All catalog versions in sorted order.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Looks up a version entry.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnknownVersion`] if the version is absent.
    pub fn version(&self, version: &str) -> Result<&VersionEntry, ToolchainError> {
        self.versions
            .get(version)
            .ok_or_else(|| ToolchainError::UnknownVersion {
                version: version.to_string(),
                available: self.versions().map(ToString::to_string).collect(),
            })
    }

    fn table(
        &self,
        version: &str,
    ) -> Result<&BTreeMap<(ToolchainKind, Os, Arch), SourceEntry>, ToolchainError> {
        let entry = self.version(version)?;
        // Presence is checked in `from_toml_str`.
        self.sources
            .get(&entry.source)
            .ok_or_else(|| ToolchainError::catalog(format!("missing source '{}'", entry.source)))
    }

    /// The toolchain kinds published for a version.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnknownVersion`] if the version is absent.
    pub fn kinds(&self, version: &str) -> Result<Vec<ToolchainKind>, ToolchainError> {
        let mut kinds: Vec<_> = self.table(version)?.keys().map(|(k, _, _)| *k).collect();
        kinds.dedup();
        Ok(kinds)
    }

    /// The build platforms a `(version, kind)` is published for.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnknownVersion`] if the version is absent.
    pub fn platforms(
        &self,
        version: &str,
        kind: ToolchainKind,
    ) -> Result<Vec<Platform>, ToolchainError> {
        Ok(self
            .table(version)?
            .keys()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, os, arch)| Platform::new(*os, *arch))
            .collect())
    }

    /// Looks up the source entry for one cell of the table.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnknownVersion`] if the version is absent.
    pub fn source(
        &self,
        version: &str,
        kind: ToolchainKind,
        platform: Platform,
    ) -> Result<Option<&SourceEntry>, ToolchainError> {
        Ok(self.table(version)?.get(&(kind, platform.os, platform.arch)))
    }

    /// Default value of the `lto` option for a `(version, kind)` pair.
    ///
    /// Falls back to `[defaults] lto` when the version does not override it.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnknownVersion`] if the version is absent.
    pub fn lto_default(&self, version: &str, kind: ToolchainKind) -> Result<bool, ToolchainError> {
        let entry = self.version(version)?;
        Ok(entry
            .lto_default
            .get(&kind)
            .copied()
            .unwrap_or(self.default_lto))
    }
}

fn parse_key<T>(value: &str, source: &str) -> Result<T, ToolchainError>
where
    T: std::str::FromStr<Err = ToolchainError>,
{
    value
        .parse()
        .map_err(|e: ToolchainError| ToolchainError::catalog(format!("sources.\"{source}\": {e}")))
}

fn validate_entry(
    entry: &SourceEntry,
    source: &str,
    kind: ToolchainKind,
    os: Os,
    arch: Arch,
) -> Result<(), ToolchainError> {
    let cell = format!("sources.\"{source}\".{kind}.{os}.{arch}");
    if entry.url.trim().is_empty() {
        return Err(ToolchainError::catalog(format!("{cell}: url is empty")));
    }
    if entry.sha256.len() != 64 || !entry.sha256.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ToolchainError::catalog(format!(
            "{cell}: sha256 must be 64 hex digits, got '{}'",
            entry.sha256
        )));
    }
    Ok(())
}
