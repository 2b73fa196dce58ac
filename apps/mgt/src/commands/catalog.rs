//! Catalog command for the mgt CLI.
//!
//! Shows every catalog version with the toolchain kinds it provides, the
//! build platforms each kind is published for, and the default of the `lto`
//! option.
//!
//! ## Usage
//!
//! ```bash
//! mgt catalog
//! mgt catalog --json
//! ```
//!
//! ## Output Format
//!
//! ```text
//! 14 (source 14.2.rel1)
//!   arm-none-eabi  lto=false  Linux/x86_64, Linux/armv8, Macos/x86_64, ... *
//!   native         lto=false  Linux/x86_64, Linux/armv8, Windows/x86_64 *
//!
//!   * = available for this machine (Linux/x86_64)
//! ```

use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::Context;
use crate::toolchain::{Catalog, Platform, ToolchainKind};

/// Arguments for the catalog command.
#[derive(Args)]
pub struct CatalogArgs {
    /// Show the catalog in JSON format.
    #[clap(long, short = 'j')]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct KindInfo {
    kind: ToolchainKind,
    lto_default: bool,
    platforms: Vec<String>,
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: String,
    source: String,
    kinds: Vec<KindInfo>,
}

/// Executes the catalog command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn execute(args: &CatalogArgs, catalog: Option<&Path>) -> Result<()> {
    let ctx = Context::load(catalog)?;
    let versions = describe(&ctx.catalog)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
    } else {
        output_text(&versions, Platform::detect().ok());
    }
    Ok(())
}

fn describe(catalog: &Catalog) -> Result<Vec<VersionInfo>> {
    let mut versions = Vec::new();
    for version in catalog.versions() {
        let mut kinds = Vec::new();
        for kind in catalog.kinds(version)? {
            kinds.push(KindInfo {
                kind,
                lto_default: catalog.lto_default(version, kind)?,
                platforms: catalog
                    .platforms(version, kind)?
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            });
        }
        versions.push(VersionInfo {
            version: version.to_string(),
            source: catalog.version(version)?.source.clone(),
            kinds,
        });
    }
    Ok(versions)
}

fn output_text(versions: &[VersionInfo], host: Option<Platform>) {
    if versions.is_empty() {
        println!("The catalog declares no versions.");
        return;
    }

    let host_name = host.map(|p| p.to_string());
    let mut has_host = false;

    for version in versions {
        println!("{} (source {})", version.version, version.source);
        for kind in &version.kinds {
            let marker = if host_name
                .as_ref()
                .is_some_and(|h| kind.platforms.contains(h))
            {
                has_host = true;
                " *"
            } else {
                ""
            };
            println!(
                "  {:<14} lto={:<5}  {}{marker}",
                kind.kind.as_str(),
                kind.lto_default,
                kind.platforms.join(", ")
            );
        }
    }

    if has_host && let Some(host) = host_name {
        println!();
        println!("  * = available for this machine ({host})");
    }
}
