//! List command for the mgt CLI.
//!
//! Displays the toolchains published in the cache.
//!
//! ## Usage
//!
//! ```bash
//! mgt list
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Installed toolchains:
//!
//!   arm-none-eabi 14    (installed 2025-03-02)
//!   native        14
//! ```

use anyhow::Result;

use crate::toolchain::ToolchainPaths;

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the cache root cannot be determined or a toolchain
/// directory cannot be read.
pub fn execute() -> Result<()> {
    let paths = ToolchainPaths::new()?;
    let installed = paths.list_installed()?;

    if installed.is_empty() {
        println!("No toolchains installed.");
        println!();
        println!("Run 'mgt install <VERSION> --kind <KIND>' to install one.");
        return Ok(());
    }

    println!("Installed toolchains:");
    println!();

    for toolchain in &installed {
        let label = format!("{:<13} {}", toolchain.kind.as_str(), toolchain.version);
        match paths.read_metadata(toolchain.kind, &toolchain.version) {
            Some(meta) => println!("  {label:<18} (installed {})", meta.installed_at),
            None => println!("  {label}"),
        }
    }

    Ok(())
}
