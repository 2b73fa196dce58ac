//! Resolve command for the mgt CLI.
//!
//! Prints the download source for a toolchain without touching the network.
//!
//! ## Usage
//!
//! ```bash
//! mgt resolve 14 --kind arm-none-eabi --build-os Linux --build-arch x86_64
//! mgt resolve 14 --kind native --json
//! ```
//!
//! ## Output Format
//!
//! ```text
//! url:    https://.../arm-gnu-toolchain-14.2.rel1-x86_64-arm-none-eabi.tar.xz
//! sha256: 62a63b981fe391a9cbad7ef51b17e49aeaa3e7b0d029b36ca1e9c3b2a9b78823
//! ```

use std::path::Path;

use anyhow::Result;
use clap::Args;

use super::{BuildPlatformArgs, Context};
use crate::toolchain::{ToolchainKind, resolve_source};

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Toolchain version from the catalog (e.g., "14").
    pub version: String,

    /// Toolchain kind: native or arm-none-eabi.
    #[clap(long)]
    pub kind: ToolchainKind,

    #[command(flatten)]
    pub build: BuildPlatformArgs,

    /// Print the source as JSON.
    #[clap(long, short = 'j')]
    pub json: bool,
}

/// Executes the resolve command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, the version is unknown,
/// or the `(kind, build os, build arch)` cell is not populated.
pub fn execute(args: &ResolveArgs, catalog: Option<&Path>) -> Result<()> {
    let ctx = Context::load(catalog)?;
    let (build_os, build_arch) = args.build.settings()?;
    let source = resolve_source(&ctx.catalog, &args.version, args.kind, &build_os, &build_arch)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(source)?);
    } else {
        println!("url:    {}", source.url);
        println!("sha256: {}", source.sha256);
    }
    Ok(())
}
