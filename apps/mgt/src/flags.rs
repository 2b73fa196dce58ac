//! Compiler and linker flag computation.
//!
//! [`compute_flags`] is a pure function of the target, the options and the
//! build type. Flags are composed in a fixed order so that identical inputs
//! always produce identical command lines:
//!
//! 1. architecture flags (ARM, `default_arch`)
//! 2. optimization level (ARM, from the build type)
//! 3. LTO flags (`lto`, `fat_lto`, `lto_compression_level`)
//! 4. section flags (`function_sections`, `data_sections`, `gc_sections`)
//! 5. libc spec (ARM, `default_libc`)
//!
//! Compile-stage and link-stage flags are returned as separate lists.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::arch::ArchDescriptor;
use crate::errors::ToolchainError;
use crate::options::Options;
use crate::toolchain::{BAREMETAL_OS, Os, ToolchainKind};

/// Ordered compile and link flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlagSet {
    /// Flags for C, C++ and assembler compilation.
    pub compile: Vec<String>,
    /// Flags for linking executables.
    pub link: Vec<String>,
}

/// CMake/Conan build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildType {
    Debug,
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Release => "Release",
            Self::RelWithDebInfo => "RelWithDebInfo",
            Self::MinSizeRel => "MinSizeRel",
        }
    }

    /// Optimization flag applied to ARM targets.
    ///
    /// Debug uses `-Og` so the code stays debuggable while remaining LTO
    /// compatible.
    #[must_use]
    pub fn optimization_flag(self) -> &'static str {
        match self {
            Self::Debug => "-Og",
            Self::MinSizeRel => "-Os",
            Self::Release | Self::RelWithDebInfo => "-O3",
        }
    }
}

impl FromStr for BuildType {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Debug" => Ok(Self::Debug),
            "Release" => Ok(Self::Release),
            "RelWithDebInfo" => Ok(Self::RelWithDebInfo),
            "MinSizeRel" => Ok(Self::MinSizeRel),
            _ => Err(ToolchainError::invalid_option(format!(
                "unknown build type '{s}' (expected Debug, Release, RelWithDebInfo or MinSizeRel)"
            ))),
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the produced binaries run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A bare-metal Cortex-M core, built with `arm-none-eabi`.
    Arm(ArchDescriptor),
    /// A hosted target built with the native toolchain. `os` is `None` when
    /// the target OS is not one of the known desktop systems.
    Native { os: Option<Os> },
}

impl TargetSpec {
    /// Builds the target from Conan-style `os`/`arch` target settings.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnknownArchitecture`] for a bare-metal
    /// target whose architecture is not a supported Cortex-M name.
    pub fn from_settings(
        target_os: Option<&str>,
        target_arch: Option<&str>,
    ) -> Result<Self, ToolchainError> {
        match (ToolchainKind::for_target(target_os, target_arch), target_arch) {
            (ToolchainKind::ArmNoneEabi, Some(arch)) => ArchDescriptor::parse(arch).map(Self::Arm),
            // `for_target` only picks the cross compiler for known cores, so a
            // bare-metal arch that falls through here is unknown.
            (_, Some(arch)) if target_os == Some(BAREMETAL_OS) => {
                Err(ToolchainError::unknown_architecture(arch))
            }
            _ => Ok(Self::Native {
                os: target_os.and_then(|os| os.parse().ok()),
            }),
        }
    }

    /// The toolchain kind that builds for this target.
    #[must_use]
    pub fn kind(&self) -> ToolchainKind {
        match self {
            Self::Arm(_) => ToolchainKind::ArmNoneEabi,
            Self::Native { .. } => ToolchainKind::Native,
        }
    }
}

/// Computes the flags implied by `options` for `target`.
#[must_use]
pub fn compute_flags(
    target: &TargetSpec,
    options: &Options,
    build_type: Option<BuildType>,
) -> FlagSet {
    let mut flags = FlagSet::default();

    if let TargetSpec::Arm(arch) = target {
        if options.default_arch {
            let arch_flags = arch.flags();
            flags.compile.extend(arch_flags.iter().cloned());
            // The linker needs the same flags to pick the matching multilib.
            flags.link.extend(arch_flags);
        }
        if let Some(build_type) = build_type {
            flags.compile.push(build_type.optimization_flag().to_string());
        }
    }

    if options.lto {
        flags.compile.push("-flto".to_string());
        flags.compile.push(format!(
            "-flto-compression-level={}",
            options.lto_compression_level
        ));
        if options.fat_lto {
            flags.compile.push("-ffat-lto-objects".to_string());
        }
        flags.link.push("-flto".to_string());
    }

    if options.function_sections {
        flags.compile.push("-ffunction-sections".to_string());
    }
    if options.data_sections {
        flags.compile.push("-fdata-sections".to_string());
    }
    if options.gc_sections
        && let Some(flag) = gc_sections_flag(target)
    {
        flags.link.push(flag.to_string());
    }

    if let TargetSpec::Arm(_) = target
        && options.default_libc
    {
        flags.link.push("--specs=nosys.specs".to_string());
    }

    tracing::debug!(compile = ?flags.compile, link = ?flags.link, "computed flags");
    flags
}

/// Linker flag for section garbage collection; `None` where GCC does it implicitly.
fn gc_sections_flag(target: &TargetSpec) -> Option<&'static str> {
    match target {
        TargetSpec::Native {
            os: Some(Os::Macos),
        } => Some("-Wl,-dead_strip"),
        TargetSpec::Native {
            os: Some(Os::Windows),
        } => None,
        _ => Some("-Wl,--gc-sections"),
    }
}
