//! Create command for the mgt CLI.
//!
//! Runs the whole package flow the way a build manager would: read the build
//! and host profiles, pick the toolchain kind, acquire the toolchain, compute
//! flags and emit the package information as JSON.
//!
//! ## Usage
//!
//! ```bash
//! mgt create 14 --build-require --profile-build linux.profile --profile-host cortex-m4f.profile
//! mgt create 14 -o lto=True --output package.json
//! ```
//!
//! With `--build-require` the package is a tool requirement: the host
//! profile describes the target the toolchain builds for. Without it the
//! package is consumed natively and the host profile only supplies the
//! target OS and options. A tool requirement takes its options from the
//! build profile instead.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;

use super::{Context, apply_cli_options, build_settings, obtain_toolchain};
use crate::flags::{BuildType, TargetSpec, compute_flags};
use crate::options::{Options, parse_assignment};
use crate::package_info::{PACKAGE_NAME, PackageContext, PackageInfo};
use crate::profile::Profile;
use crate::toolchain::Os;

/// Arguments for the create command.
#[derive(Args)]
pub struct CreateArgs {
    /// Toolchain version from the catalog (e.g., "14").
    pub version: String,

    /// Create the package as a tool requirement (build context only).
    #[clap(long = "build-require")]
    pub build_require: bool,

    /// Profile describing the build machine.
    #[clap(long = "profile-build")]
    pub profile_build: Option<PathBuf>,

    /// Profile describing the host (target) machine.
    #[clap(long = "profile-host")]
    pub profile_host: Option<PathBuf>,

    /// Package option as NAME=VALUE (repeatable). Overrides profile options.
    #[clap(short = 'o', long = "option", value_parser = parse_assignment)]
    pub options: Vec<(String, String)>,

    /// Write the package information to a file instead of stdout.
    #[clap(long, short = 'O')]
    pub output: Option<PathBuf>,
}

/// Executes the create command.
///
/// # Process
///
/// 1. Load profiles; the build profile supplies the build platform
/// 2. Derive the target from the host profile (with `--build-require`)
/// 3. Build options: catalog defaults, then profile options, then `-o`
/// 4. Acquire the toolchain (or use `local_path`)
/// 5. Compute flags and write the package information
///
/// # Errors
///
/// Returns an error if a profile is malformed, the target architecture is
/// unknown, the platform is unsupported, or acquisition fails.
pub async fn execute(args: &CreateArgs, catalog: Option<&Path>) -> Result<()> {
    let ctx = Context::load(catalog)?;
    let build_profile = load_optional(args.profile_build.as_deref())?;
    let host_profile = load_optional(args.profile_host.as_deref())?;

    let (build_os, build_arch) = build_settings(build_profile.os(), build_profile.arch())?;

    let (target, build_type) = if args.build_require {
        let target = TargetSpec::from_settings(host_profile.os(), host_profile.arch())?;
        let build_type = host_profile
            .build_type()
            .map(str::parse::<BuildType>)
            .transpose()?;
        (target, build_type)
    } else {
        (TargetSpec::Native { os: None }, None)
    };
    // Hosted targets without a recognised OS fall back to the host profile,
    // then to the build machine.
    let target = match target {
        TargetSpec::Native { os: None } => TargetSpec::Native {
            os: host_profile.os().unwrap_or(&build_os).parse::<Os>().ok(),
        },
        other => other,
    };
    let kind = target.kind();
    tracing::info!(%kind, build_os = %build_os, build_arch = %build_arch, "creating package");

    let mut options = Options::defaults(&ctx.catalog, &args.version, kind)?;
    // A tool requirement lives in the build context and takes the build
    // profile's options.
    let option_profile = if args.build_require {
        &build_profile
    } else {
        &host_profile
    };
    options.apply(option_profile.options_for(PACKAGE_NAME, &args.version))?;
    apply_cli_options(&mut options, &args.options)?;

    let acquired = obtain_toolchain(
        &ctx,
        &args.version,
        kind,
        (&build_os, &build_arch),
        &options,
    )
    .await?;

    let flags = compute_flags(&target, &options, build_type);
    let info = PackageInfo::new(
        PackageContext {
            version: &args.version,
            target: &target,
            root: &acquired.root,
            build_require: args.build_require,
        },
        options,
        flags,
    );

    let json = serde_json::to_string_pretty(&info)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote package information to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn load_optional(path: Option<&Path>) -> Result<Profile> {
    path.map_or_else(|| Ok(Profile::default()), Profile::load)
}
