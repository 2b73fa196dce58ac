#![warn(clippy::pedantic)]

//! # Multiarch GNU Toolchain (mgt)
//!
//! The `mgt` command selects, downloads, verifies and exposes prebuilt GNU
//! toolchains: native GCC for Linux, macOS and Windows hosts, and the
//! `arm-none-eabi` cross compiler for ARM Cortex-M targets.
//!
//! ## Subcommands
//!
//! - `resolve` - Print the download source for a toolchain
//! - `install` - Download, verify and unpack a toolchain
//! - `flags` - Print compiler and linker flags for a target
//! - `create` - Full package flow, emitting package information as JSON
//! - `catalog` - Show catalog versions and supported build platforms
//! - `list` - List installed toolchains
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Any other failure |
//! | 2 | No catalog entry for the requested platform |
//! | 3 | Downloaded artifact failed checksum verification |
//! | 4 | Unknown target architecture |
//!
//! ## Examples
//!
//! Print the source of the ARM toolchain for this machine:
//! ```bash
//! mgt resolve 14 --kind arm-none-eabi
//! ```
//!
//! Flags for a Cortex-M4F release build:
//! ```bash
//! mgt flags 14 --target-os baremetal --target-arch cortex-m4f --build-type Release
//! ```

mod arch;
mod commands;
mod errors;
mod flags;
mod options;
mod package_info;
mod profile;
mod toolchain;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{catalog, create, flags as flags_cmd, install, list, resolve};
use errors::ToolchainError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Prebuilt GNU toolchain resolver.
#[derive(Parser)]
#[command(
    name = "mgt",
    author,
    version,
    about = "Resolve, verify and install prebuilt GNU toolchains",
    long_about = "The 'mgt' command selects a prebuilt native GCC or arm-none-eabi toolchain \
    for a version and build platform, verifies its checksum, unpacks it into a cache and \
    computes the compiler and linker flags implied by the package options.",
    after_help = "\
CATALOG RESOLUTION:
    The toolchain catalog is read from the first of:
    1. --catalog <FILE>
    2. MGT_CATALOG environment variable
    3. <MGT_HOME>/catalog.toml

EXIT CODES:
    2   unsupported build platform / toolchain combination
    3   checksum mismatch
    4   unknown target architecture

ENVIRONMENT VARIABLES:
    MGT_HOME                Cache directory (default: ~/.mgt)
    MGT_CATALOG             Catalog file
    RUST_LOG                Log filter (default: warn)"
)]
pub struct Cli {
    /// Catalog file to read versions and download sources from.
    #[clap(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Log debug output to stderr.
    #[clap(long, short = 'v', global = true, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the mgt CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Print the download source for a toolchain.
    ///
    /// Looks up the URL and SHA256 for a version, toolchain kind and build
    /// platform. No network access.
    Resolve(resolve::ResolveArgs),

    /// Install a toolchain into the cache.
    ///
    /// Downloads the archive, verifies its checksum, unpacks it and prints
    /// the toolchain root. Already installed toolchains are reused.
    Install(install::InstallArgs),

    /// Print compiler and linker flags for a target.
    ///
    /// Flags are computed from the package options and the target
    /// architecture. No toolchain is downloaded.
    Flags(flags_cmd::FlagsArgs),

    /// Create the package from build and host profiles.
    ///
    /// Selects the toolchain kind, acquires the toolchain, computes flags and
    /// writes the package information as JSON.
    Create(create::CreateArgs),

    /// Show catalog versions and supported build platforms.
    Catalog(catalog::CatalogArgs),

    /// List installed toolchains.
    List,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// Prints an error and returns the exit code for it.
///
/// Typed [`ToolchainError`]s anywhere in the chain select their own exit
/// code; everything else exits with 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:#}");
    e.chain()
        .find_map(|cause| cause.downcast_ref::<ToolchainError>())
        .map_or(1, ToolchainError::exit_code)
}

async fn run(cli: Cli) -> Result<()> {
    let catalog_path = cli.catalog.as_deref();

    match cli.command {
        Commands::Resolve(args) => resolve::execute(&args, catalog_path),
        Commands::Install(args) => install::execute(&args, catalog_path).await,
        Commands::Flags(args) => flags_cmd::execute(&args, catalog_path),
        Commands::Create(args) => create::execute(&args, catalog_path).await,
        Commands::Catalog(args) => catalog::execute(&args, catalog_path),
        Commands::List => list::execute(),
    }
}
