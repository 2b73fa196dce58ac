//! Command modules for the mgt CLI.
//!
//! ## Resolution Commands
//!
//! - [`resolve`] - Print the download source for a toolchain
//! - [`flags`] - Print compiler and linker flags for a target
//! - [`catalog`] - Show catalog versions and supported build platforms
//!
//! ## Installation Commands
//!
//! - [`install`] - Download, verify and unpack a toolchain
//! - [`create`] - Full package flow, emitting package information as JSON
//! - [`list`] - List installed toolchains

pub mod catalog;
pub mod create;
pub mod flags;
pub mod install;
pub mod list;
pub mod resolve;

use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::errors::ToolchainError;
use crate::options::Options;
use crate::toolchain::{
    AcquireRequest, Acquired, Catalog, Platform, ToolchainKind, ToolchainPaths, acquire,
    ensure_kind, resolve_source, use_local,
};

/// Cache paths and the loaded catalog, shared by commands that resolve toolchains.
pub struct Context {
    pub paths: ToolchainPaths,
    pub catalog: Catalog,
}

impl Context {
    /// Locates the cache root and loads the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// catalog cannot be read or fails validation.
    pub fn load(catalog: Option<&Path>) -> Result<Self> {
        let paths = ToolchainPaths::new()?;
        let catalog_path = Catalog::locate(catalog, &paths);
        let catalog = Catalog::load(&catalog_path)?;
        Ok(Self { paths, catalog })
    }
}

/// `--build-os` / `--build-arch`, defaulting to the running machine.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildPlatformArgs {
    /// Build machine OS (Linux, Macos, Windows). Defaults to this machine.
    #[clap(long = "build-os")]
    pub build_os: Option<String>,

    /// Build machine architecture (x86_64, armv8). Defaults to this machine.
    #[clap(long = "build-arch")]
    pub build_arch: Option<String>,
}

impl BuildPlatformArgs {
    /// Returns the `(os, arch)` settings, filling gaps from host detection.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnsupportedCombination`] when a value is
    /// missing and the running machine is not a supported build platform.
    pub fn settings(&self) -> Result<(String, String), ToolchainError> {
        build_settings(self.build_os.as_deref(), self.build_arch.as_deref())
    }
}

/// Fills missing build settings from the running machine.
///
/// # Errors
///
/// See [`BuildPlatformArgs::settings`].
pub fn build_settings(
    os: Option<&str>,
    arch: Option<&str>,
) -> Result<(String, String), ToolchainError> {
    if let (Some(os), Some(arch)) = (os, arch) {
        return Ok((os.to_string(), arch.to_string()));
    }
    let host = Platform::detect()?;
    Ok((
        os.map_or_else(|| host.os.as_str().to_string(), ToString::to_string),
        arch.map_or_else(|| host.arch.as_str().to_string(), ToString::to_string),
    ))
}

/// Applies `-o NAME=VALUE` pairs to an options record.
///
/// # Errors
///
/// Returns [`ToolchainError::InvalidOption`] for rejected names or values.
pub fn apply_cli_options(
    options: &mut Options,
    assignments: &[(String, String)],
) -> Result<(), ToolchainError> {
    options.apply(
        assignments
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    )
}

/// Makes the toolchain available, honoring `local_path`.
///
/// With `local_path` set only the version and kind are checked against the
/// catalog; the build platform does not need a catalog entry.
///
/// # Errors
///
/// Propagates resolution and acquisition errors.
pub async fn obtain_toolchain(
    ctx: &Context,
    version: &str,
    kind: ToolchainKind,
    build: (&str, &str),
    options: &Options,
) -> Result<Acquired> {
    if let Some(local) = options.local_path.as_deref() {
        ensure_kind(&ctx.catalog, version, kind)?;
        return Ok(use_local(local));
    }

    let (build_os, build_arch) = build;
    let source = resolve_source(&ctx.catalog, version, kind, build_os, build_arch)?;
    let platform = Platform::parse(build_os, build_arch)?;
    acquire(
        &ctx.paths,
        AcquireRequest {
            kind,
            version,
            build_os: platform.os,
            source,
        },
        None,
    )
    .await
}
