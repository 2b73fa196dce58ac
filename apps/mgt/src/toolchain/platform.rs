//! Build platform model for prebuilt toolchain archives.
//!
//! Prebuilt binaries are published per build machine, identified by the
//! operating system and CPU architecture spelled the way Conan settings spell
//! them (`Linux`, `Macos`, `Windows`; `x86_64`, `armv8`).
//!
//! ## Supported Platforms
//!
//! | OS        | Architectures       |
//! |-----------|---------------------|
//! | `Linux`   | `x86_64`, `armv8`   |
//! | `Macos`   | `x86_64`, `armv8`   |
//! | `Windows` | `x86_64`, `armv8`   |
//!
//! Whether a given toolchain kind is actually published for a platform is
//! decided by the catalog, not here.

use std::fmt;
use std::str::FromStr;

use crate::errors::ToolchainError;

/// Operating system of a build machine or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
    Linux,
    Macos,
    Windows,
}

impl Os {
    /// All operating systems prebuilt toolchains exist for.
    pub const ALL: [Self; 3] = [Self::Linux, Self::Macos, Self::Windows];

    /// Returns the Conan settings spelling of this OS.
    #[must_use = "returns the OS string without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Macos => "Macos",
            Self::Windows => "Windows",
        }
    }

    /// Returns the `CMAKE_SYSTEM_NAME` value for this OS.
    #[must_use = "returns the CMake system name without side effects"]
    pub fn cmake_system_name(self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Macos => "Darwin",
            Self::Windows => "Windows",
        }
    }
}

impl FromStr for Os {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Linux" | "linux" => Ok(Self::Linux),
            "Macos" | "macos" | "darwin" => Ok(Self::Macos),
            "Windows" | "windows" => Ok(Self::Windows),
            other => Err(ToolchainError::unsupported(format!(
                "build os '{other}' is not supported; prebuilt binaries exist for Linux, Macos, Windows"
            ))),
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture of a build machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    X86_64,
    Armv8,
}

impl Arch {
    /// All architectures prebuilt toolchains exist for.
    pub const ALL: [Self; 2] = [Self::X86_64, Self::Armv8];

    /// Returns the Conan settings spelling of this architecture.
    #[must_use = "returns the architecture string without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Armv8 => "armv8",
        }
    }
}

impl FromStr for Arch {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "armv8" | "aarch64" | "arm64" => Ok(Self::Armv8),
            other => Err(ToolchainError::unsupported(format!(
                "build architecture '{other}' is not supported; prebuilt binaries exist for x86_64, armv8"
            ))),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build machine: the platform the downloaded compiler runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Parses a platform from Conan-style `os` and `arch` setting values.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnsupportedCombination`] if either value is
    /// outside the supported set.
    pub fn parse(os: &str, arch: &str) -> Result<Self, ToolchainError> {
        Ok(Self::new(os.parse()?, arch.parse()?))
    }

    /// Detects the platform this process is running on.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnsupportedCombination`] when the host is not
    /// one of the supported build platforms.
    pub fn detect() -> Result<Self, ToolchainError> {
        Self::parse(std::env::consts::OS, std::env::consts::ARCH)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
