//! Information a build manager needs to consume an installed toolchain.
//!
//! [`PackageInfo`] bundles the toolchain root, executable names, build
//! environment variables, CMake toolchain variables and the computed flags.
//! It is serialized to JSON by `mgt create`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::flags::{FlagSet, TargetSpec};
use crate::options::Options;
use crate::toolchain::ToolchainKind;

/// Package name as it appears in profiles and tool requirements.
pub const PACKAGE_NAME: &str = "multiarch-gnu-toolchain";

/// Binutils exported as CMake variables, as `(variable, tool)`.
const CMAKE_BINUTILS: [(&str, &str); 6] = [
    ("CMAKE_AR", "ar"),
    ("CMAKE_RANLIB", "ranlib"),
    ("CMAKE_STRIP", "strip"),
    ("CMAKE_OBJCOPY", "objcopy"),
    ("CMAKE_OBJDUMP", "objdump"),
    ("CMAKE_NM", "nm"),
];

/// Build environment variables, as `(variable, tool)`.
const BUILD_ENV_TOOLS: [(&str, &str); 12] = [
    ("CC", "gcc"),
    ("CXX", "g++"),
    ("AS", "gcc"),
    ("AR", "ar"),
    ("LD", "ld"),
    ("NM", "nm"),
    ("OBJCOPY", "objcopy"),
    ("OBJDUMP", "objdump"),
    ("RANLIB", "ranlib"),
    ("SIZE", "size"),
    ("STRIP", "strip"),
    ("GDB", "gdb"),
];

/// Per-configuration CMake flag variables blanked for cross builds so the
/// computed optimization flags are the only ones in effect.
const CMAKE_CONFIG_FLAGS: [&str; 8] = [
    "CMAKE_CXX_FLAGS_DEBUG",
    "CMAKE_CXX_FLAGS_RELEASE",
    "CMAKE_CXX_FLAGS_MINSIZEREL",
    "CMAKE_CXX_FLAGS_RELWITHDEBINFO",
    "CMAKE_C_FLAGS_DEBUG",
    "CMAKE_C_FLAGS_RELEASE",
    "CMAKE_C_FLAGS_MINSIZEREL",
    "CMAKE_C_FLAGS_RELWITHDEBINFO",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerExecutables {
    pub c: String,
    pub cpp: String,
    pub asm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CmakeInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_processor: Option<String>,
    pub extra_variables: BTreeMap<String, String>,
}

/// Everything a consumer needs to build with the toolchain.
#[derive(Debug, Clone, Serialize)]
pub struct PackageInfo {
    pub name: &'static str,
    pub version: String,
    pub kind: ToolchainKind,
    /// Created as a tool requirement (build context) rather than a library.
    pub build_require: bool,
    pub root: PathBuf,
    pub bin_dirs: Vec<PathBuf>,
    pub compiler_executables: CompilerExecutables,
    pub build_env: BTreeMap<String, String>,
    pub cmake: CmakeInfo,
    /// Whether binaries produced by the toolchain run on the build machine.
    pub can_run: bool,
    pub flags: FlagSet,
    pub options: Options,
}

/// Builder inputs for [`PackageInfo`].
#[derive(Debug, Clone, Copy)]
pub struct PackageContext<'a> {
    pub version: &'a str,
    pub target: &'a TargetSpec,
    pub root: &'a Path,
    pub build_require: bool,
}

impl PackageInfo {
    /// Assembles the package information for an acquired toolchain.
    #[must_use]
    pub fn new(ctx: PackageContext<'_>, options: Options, flags: FlagSet) -> Self {
        let kind = ctx.target.kind();
        let root = ctx.root.to_path_buf();

        let mut build_env: BTreeMap<String, String> = BUILD_ENV_TOOLS
            .iter()
            .map(|(var, tool)| ((*var).to_string(), kind.tool(tool)))
            .collect();
        build_env.insert("GCC_INSTALL_DIR".to_string(), root.display().to_string());

        Self {
            name: PACKAGE_NAME,
            version: ctx.version.to_string(),
            kind,
            build_require: ctx.build_require,
            bin_dirs: vec![root.join("bin")],
            root,
            compiler_executables: CompilerExecutables {
                c: kind.tool("gcc"),
                cpp: kind.tool("g++"),
                asm: kind.tool("gcc"),
            },
            build_env,
            cmake: cmake_info(ctx.target),
            can_run: kind == ToolchainKind::Native,
            flags,
            options,
        }
    }
}

fn cmake_info(target: &TargetSpec) -> CmakeInfo {
    let kind = target.kind();
    let mut extra_variables: BTreeMap<String, String> = CMAKE_BINUTILS
        .iter()
        .map(|(var, tool)| ((*var).to_string(), kind.tool(tool)))
        .collect();

    match target {
        TargetSpec::Arm(_) => {
            for var in CMAKE_CONFIG_FLAGS {
                extra_variables.insert(var.to_string(), String::new());
            }
            for var in ["CMAKE_C_COMPILER_WORKS", "CMAKE_CXX_COMPILER_WORKS"] {
                extra_variables.insert(var.to_string(), "TRUE".to_string());
            }
            extra_variables.insert(
                "CMAKE_TRY_COMPILE_TARGET_TYPE".to_string(),
                "STATIC_LIBRARY".to_string(),
            );
            extra_variables.insert("CMAKE_SIZE_UTIL".to_string(), kind.tool("size"));
            CmakeInfo {
                system_name: Some("Generic".to_string()),
                system_processor: Some("ARM".to_string()),
                extra_variables,
            }
        }
        TargetSpec::Native { os } => {
            extra_variables.insert("CMAKE_C_COMPILER".to_string(), kind.tool("gcc"));
            extra_variables.insert("CMAKE_CXX_COMPILER".to_string(), kind.tool("g++"));
            extra_variables.insert("CMAKE_ASM_COMPILER".to_string(), kind.tool("gcc"));
            CmakeInfo {
                system_name: os.map(|os| os.cmake_system_name().to_string()),
                system_processor: None,
                extra_variables,
            }
        }
    }
}
