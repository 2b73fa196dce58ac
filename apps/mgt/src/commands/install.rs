//! Install command for the mgt CLI.
//!
//! Downloads, verifies and unpacks a toolchain into the cache, then prints
//! the toolchain root on stdout.
//!
//! ## Usage
//!
//! ```bash
//! mgt install 14 --kind arm-none-eabi
//! mgt install 14 -o local_path=/opt/gcc-arm   # Use an existing installation
//! ```

use std::path::Path;

use anyhow::Result;
use clap::Args;

use super::{BuildPlatformArgs, Context, apply_cli_options, obtain_toolchain};
use crate::options::{Options, parse_assignment};
use crate::toolchain::{Origin, ToolchainKind};

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Toolchain version from the catalog (e.g., "14").
    pub version: String,

    /// Toolchain kind: native or arm-none-eabi.
    #[clap(long, default_value = "native")]
    pub kind: ToolchainKind,

    #[command(flatten)]
    pub build: BuildPlatformArgs,

    /// Package option as NAME=VALUE (repeatable).
    #[clap(short = 'o', long = "option", value_parser = parse_assignment)]
    pub options: Vec<(String, String)>,
}

/// Executes the install command.
///
/// # Process
///
/// 1. Load the catalog and build the options record
/// 2. Resolve the source for the build platform (skipped with `local_path`)
/// 3. Download, verify, unpack and publish the toolchain
/// 4. Print the toolchain root
///
/// # Errors
///
/// Returns an error if:
/// - The catalog cannot be loaded or the version is unknown
/// - An option is unknown or malformed
/// - The build platform has no catalog entry
/// - Download, checksum verification or extraction fails
pub async fn execute(args: &InstallArgs, catalog: Option<&Path>) -> Result<()> {
    let ctx = Context::load(catalog)?;
    let mut options = Options::defaults(&ctx.catalog, &args.version, args.kind)?;
    apply_cli_options(&mut options, &args.options)?;
    let (build_os, build_arch) = args.build.settings()?;

    let acquired = obtain_toolchain(
        &ctx,
        &args.version,
        args.kind,
        (&build_os, &build_arch),
        &options,
    )
    .await?;

    match acquired.origin {
        Origin::Downloaded => eprintln!("Installed {} {}", args.kind, args.version),
        Origin::Cache => eprintln!("{} {} is already installed", args.kind, args.version),
        Origin::LocalPath => eprintln!("Using local toolchain"),
    }
    println!("{}", acquired.root.display());
    Ok(())
}
