//! Toolchain kinds and their selection from target settings.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::arch;
use crate::errors::ToolchainError;

/// Target OS value Conan uses for bare-metal microcontroller targets.
pub const BAREMETAL_OS: &str = "baremetal";

/// The two families of prebuilt GCC the catalog can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ToolchainKind {
    /// Host-targeting GCC.
    #[serde(rename = "native")]
    Native,
    /// ARM Cortex-M cross compiler.
    #[serde(rename = "arm-none-eabi")]
    ArmNoneEabi,
}

impl ToolchainKind {
    pub const ALL: [Self; 2] = [Self::Native, Self::ArmNoneEabi];

    /// Catalog and cache-directory spelling of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::ArmNoneEabi => "arm-none-eabi",
        }
    }

    /// Prefix prepended to every binutils/GCC executable name.
    #[must_use]
    pub fn tool_prefix(self) -> &'static str {
        match self {
            Self::Native => "",
            Self::ArmNoneEabi => "arm-none-eabi-",
        }
    }

    /// Returns the executable name of `tool` for this kind (`gcc`, `g++`, `ar`, ...).
    #[must_use]
    pub fn tool(self, tool: &str) -> String {
        format!("{}{tool}", self.tool_prefix())
    }

    /// Chooses the toolchain kind for a target.
    ///
    /// Without target settings the package is consumed natively. Bare-metal
    /// targets whose architecture is a supported Cortex-M core need the
    /// cross compiler; every other target gets the native toolchain.
    #[must_use]
    pub fn for_target(target_os: Option<&str>, target_arch: Option<&str>) -> Self {
        match (target_os, target_arch) {
            (Some(BAREMETAL_OS), Some(arch)) if arch::is_supported(arch) => {
                tracing::debug!(arch, "using the arm-none-eabi cross compiler");
                Self::ArmNoneEabi
            }
            (None, _) => {
                tracing::debug!("no target settings, using the native toolchain");
                Self::Native
            }
            (Some(os), _) => {
                tracing::debug!(os, "using the native toolchain");
                Self::Native
            }
        }
    }
}

impl FromStr for ToolchainKind {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Self::Native),
            "arm-none-eabi" => Ok(Self::ArmNoneEabi),
            other => Err(ToolchainError::unsupported(format!(
                "toolchain kind '{other}' is not one of: native, arm-none-eabi"
            ))),
        }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
