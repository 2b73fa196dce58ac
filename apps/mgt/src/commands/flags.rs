//! Flags command for the mgt CLI.
//!
//! Prints the compile and link flags the package would inject for a target.
//! No toolchain is downloaded.
//!
//! ## Usage
//!
//! ```bash
//! mgt flags 14 --target-os baremetal --target-arch cortex-m4f --build-type MinSizeRel
//! mgt flags 14 --target-os Linux -o lto=True --json
//! ```
//!
//! ## Output Format
//!
//! ```text
//! compile: -mcpu=cortex-m4 -mfloat-abi=hard -mfpu=fpv4-sp-d16 -Os -ffunction-sections -fdata-sections
//! link:    -mcpu=cortex-m4 -mfloat-abi=hard -mfpu=fpv4-sp-d16 -Wl,--gc-sections --specs=nosys.specs
//! ```

use std::path::Path;

use anyhow::Result;
use clap::Args;

use super::{Context, apply_cli_options};
use crate::flags::{BuildType, TargetSpec, compute_flags};
use crate::options::{Options, parse_assignment};
use crate::toolchain::{Platform, ensure_kind};

/// Arguments for the flags command.
#[derive(Args)]
pub struct FlagsArgs {
    /// Toolchain version from the catalog (e.g., "14").
    pub version: String,

    /// Target OS (baremetal, Linux, Macos, Windows). Defaults to this machine.
    #[clap(long = "target-os")]
    pub target_os: Option<String>,

    /// Target architecture (e.g., cortex-m4f).
    #[clap(long = "target-arch")]
    pub target_arch: Option<String>,

    /// Build type selecting the optimization level for ARM targets.
    #[clap(long = "build-type")]
    pub build_type: Option<BuildType>,

    /// Package option as NAME=VALUE (repeatable).
    #[clap(short = 'o', long = "option", value_parser = parse_assignment)]
    pub options: Vec<(String, String)>,

    /// Print the flags as JSON.
    #[clap(long, short = 'j')]
    pub json: bool,
}

/// Executes the flags command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, the version does not
/// provide the required toolchain kind, the target architecture is unknown,
/// or an option is rejected.
pub fn execute(args: &FlagsArgs, catalog: Option<&Path>) -> Result<()> {
    let ctx = Context::load(catalog)?;

    let mut target =
        TargetSpec::from_settings(args.target_os.as_deref(), args.target_arch.as_deref())?;
    if let TargetSpec::Native { os: None } = target
        && args.target_os.is_none()
        && let Ok(host) = Platform::detect()
    {
        target = TargetSpec::Native { os: Some(host.os) };
    }

    let kind = target.kind();
    ensure_kind(&ctx.catalog, &args.version, kind)?;
    let mut options = Options::defaults(&ctx.catalog, &args.version, kind)?;
    apply_cli_options(&mut options, &args.options)?;

    let flags = compute_flags(&target, &options, args.build_type);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&flags)?);
    } else {
        println!("compile: {}", flags.compile.join(" "));
        println!("link:    {}", flags.link.join(" "));
    }
    Ok(())
}
