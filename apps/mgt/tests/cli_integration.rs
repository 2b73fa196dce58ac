#![warn(clippy::pedantic)]

//! Integration tests for the mgt CLI.
//!
//! These tests spawn the compiled `mgt` binary and validate its behavior
//! through stdout, stderr, exit codes and the files it leaves in the cache.
//!
//! ## Test Strategy
//!
//! 1. **Help and version**: CLI metadata display
//! 2. **Resolve**: catalog lookups, unsupported platforms, unknown versions
//! 3. **Flags**: architecture decomposition, option handling, exit codes
//! 4. **Install**: `file://` artifacts, checksum failures, `local_path`
//! 5. **List and catalog**: cache and catalog listings
//! 6. **Create**: profile-driven package flow with JSON output
//!
//! ## Test Infrastructure
//!
//! - Uses `assert_cmd` for spawning and asserting on command execution
//! - Uses `assert_fs` for temporary filesystem operations
//! - Uses `predicates` for flexible output matching
//! - Each test builds its own toolchain archive and catalog at run time, with
//!   `file://` URLs, so no network access is needed
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p multiarch-gnu-toolchain
//! ```

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Files packed into the fixture toolchain archive.
const ARCHIVE_FILES: [(&str, &[u8]); 3] = [
    (
        "arm-gnu-toolchain-14.2.rel1/bin/arm-none-eabi-gcc",
        b"#!/bin/sh\necho arm-none-eabi-gcc\n",
    ),
    (
        "arm-gnu-toolchain-14.2.rel1/bin/arm-none-eabi-g++",
        b"#!/bin/sh\necho arm-none-eabi-g++\n",
    ),
    (
        "arm-gnu-toolchain-14.2.rel1/share/doc/README",
        b"fixture toolchain\n",
    ),
];

/// An isolated mgt home with a catalog pointing at a local archive.
struct Fixture {
    temp: assert_fs::TempDir,
    archive: PathBuf,
}

impl Fixture {
    /// Builds the archive and writes a catalog declaring its checksum.
    fn new() -> Self {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.child("dist/arm-gnu-toolchain-14.2.rel1.tar.gz");
        temp.child("dist").create_dir_all().unwrap();
        write_tar_gz(archive.path());

        let sha256 = sha256_hex(archive.path());
        let url = format!("file://{}", archive.path().display());
        temp.child("catalog.toml")
            .write_str(&catalog_toml(&url, &sha256))
            .unwrap();

        Self {
            archive: archive.path().to_path_buf(),
            temp,
        }
    }

    fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    fn catalog(&self) -> PathBuf {
        self.temp.path().join("catalog.toml")
    }

    fn toolchain_root(&self, kind: &str, version: &str) -> PathBuf {
        self.home().join("toolchains").join(kind).join(version)
    }

    /// `mgt` with an isolated home, the fixture catalog and no inherited
    /// configuration.
    fn mgt(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mgt"));
        cmd.env("MGT_HOME", self.home())
            .env_remove("MGT_CATALOG")
            .env_remove("RUST_LOG")
            .arg("--catalog")
            .arg(self.catalog());
        cmd
    }

    /// Flips one byte in the middle of the archive after the catalog was written.
    fn corrupt_archive(&self) {
        let mut bytes = std::fs::read(&self.archive).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xff;
        std::fs::write(&self.archive, bytes).unwrap();
    }
}

/// Shaped like the release tarballs: a `./` entry first, a wrapper folder,
/// and driver aliases stored as a hard link and a symlink.
fn write_tar_gz(path: &Path) {
    let file = std::fs::File::create(path).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_size(0);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, "./", std::io::empty()).unwrap();

    for (name, contents) in ARCHIVE_FILES {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, name, contents).unwrap();
    }

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Link);
    header.set_size(0);
    header.set_mode(0o755);
    builder
        .append_link(
            &mut header,
            "arm-gnu-toolchain-14.2.rel1/arm-none-eabi/bin/gcc",
            "arm-gnu-toolchain-14.2.rel1/bin/arm-none-eabi-gcc",
        )
        .unwrap();

    if cfg!(unix) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        builder
            .append_link(
                &mut header,
                "arm-gnu-toolchain-14.2.rel1/bin/arm-none-eabi-c++",
                "arm-none-eabi-g++",
            )
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
}

fn sha256_hex(path: &Path) -> String {
    hex::encode(Sha256::digest(std::fs::read(path).unwrap()))
}

/// GCC 14 with the ARM toolchain on every build platform and the native
/// toolchain on Linux x86_64 only. All cells point at the same archive.
fn catalog_toml(url: &str, sha256: &str) -> String {
    let mut doc = String::from(
        "[defaults]\nlto = true\n\n\
         [versions.\"14\"]\nsource = \"14.2.rel1\"\n\
         lto_default = { native = false, arm-none-eabi = false }\n\n\
         [versions.\"15\"]\nsource = \"15.1.rel1\"\n",
    );
    for os in ["Linux", "Macos", "Windows"] {
        for arch in ["x86_64", "armv8"] {
            doc.push_str(&format!(
                "\n[sources.\"14.2.rel1\".arm-none-eabi.{os}.{arch}]\nurl = '{url}'\nsha256 = \"{sha256}\"\n"
            ));
        }
    }
    doc.push_str(&format!(
        "\n[sources.\"14.2.rel1\".native.Linux.x86_64]\nurl = '{url}'\nsha256 = \"{sha256}\"\n"
    ));
    doc.push_str(&format!(
        "\n[sources.\"15.1.rel1\".arm-none-eabi.Linux.x86_64]\nurl = '{url}'\nsha256 = \"{sha256}\"\n"
    ));
    doc
}

// =============================================================================
// Help and Version
// =============================================================================

/// Verifies that `mgt --help` lists every subcommand.
#[test]
fn help_shows_available_commands() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mgt"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("flags"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("catalog"))
        .stdout(predicate::str::contains("list"));
}

/// Verifies that `mgt --version` prints the package version.
#[test]
fn version_flag_shows_version() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mgt"));
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// Verifies that a missing catalog is reported with a hint.
///
/// **Expected behavior**: Exit with code 1 and mention `--catalog`.
#[test]
fn missing_catalog_shows_error() {
    let temp = assert_fs::TempDir::new().unwrap();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mgt"));
    cmd.env("MGT_HOME", temp.path())
        .env_remove("MGT_CATALOG")
        .args(["resolve", "14", "--kind", "native"]);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("--catalog"));
}

// =============================================================================
// Resolve Command
// =============================================================================

/// Verifies that the ARM Linux x86_64 cell resolves to its declared source.
#[test]
fn resolve_prints_declared_source() {
    let fx = Fixture::new();
    let sha256 = sha256_hex(&fx.archive);

    fx.mgt()
        .args(["resolve", "14", "--kind", "arm-none-eabi"])
        .args(["--build-os", "Linux", "--build-arch", "x86_64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("file://"))
        .stdout(predicate::str::contains(sha256));
}

/// Verifies that native toolchains are unsupported on macOS build machines.
///
/// **Expected behavior**: Exit with code 2, suggesting `local_path`.
#[test]
fn resolve_native_macos_exits_with_unsupported() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["resolve", "14", "--kind", "native"])
        .args(["--build-os", "Macos", "--build-arch", "armv8"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported combination"))
        .stderr(predicate::str::contains("local_path"));
}

/// Verifies that an unknown build OS is rejected before any download.
#[test]
fn resolve_unknown_build_os_exits_with_unsupported() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["resolve", "14", "--kind", "arm-none-eabi"])
        .args(["--build-os", "FreeBSD", "--build-arch", "x86_64"])
        .assert()
        .code(2);
}

/// Verifies that an unknown version lists the catalog versions.
#[test]
fn resolve_unknown_version_lists_available() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["resolve", "9", "--kind", "native"])
        .args(["--build-os", "Linux", "--build-arch", "x86_64"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("14, 15"));
}

/// Verifies that `resolve --json` emits the source record.
#[test]
fn resolve_json_output() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["resolve", "14", "--kind", "native", "--json"])
        .args(["--build-os", "Linux", "--build-arch", "x86_64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"url\""))
        .stdout(predicate::str::contains("\"sha256\""));
}

// =============================================================================
// Flags Command
// =============================================================================

/// Verifies the Cortex-M4F architecture flags with section flags disabled.
#[test]
fn flags_cortex_m4f_hard_float() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["flags", "14", "--target-os", "baremetal", "--target-arch", "cortex-m4f"])
        .args(["-o", "function_sections=False", "-o", "data_sections=False"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "compile: -mcpu=cortex-m4 -mfloat-abi=hard -mfpu=fpv4-sp-d16\n",
        ))
        .stdout(predicate::str::contains("-flto").not());
}

/// Verifies that Cortex-M0 gets soft-float and no FPU.
#[test]
fn flags_cortex_m0_soft_float() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["flags", "14", "--target-os", "baremetal", "--target-arch", "cortex-m0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-mcpu=cortex-m0 -mfloat-abi=soft"))
        .stdout(predicate::str::contains("-mfpu").not());
}

/// Verifies that enabling LTO and a build type extends the flags.
#[test]
fn flags_with_lto_and_build_type() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["flags", "14", "--target-os", "baremetal", "--target-arch", "cortex-m7d"])
        .args(["--build-type", "MinSizeRel", "-o", "lto=True", "-o", "lto_compression_level=5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-mfpu=fpv5-d16 -Os -flto -flto-compression-level=5"))
        .stdout(predicate::str::contains("--specs=nosys.specs"));
}

/// Verifies that unknown Cortex-M names fail with the architecture exit code.
#[test]
fn flags_unknown_architecture_exits_with_code_4() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["flags", "14", "--target-os", "baremetal", "--target-arch", "cortex-m0f"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("unknown architecture"));
}

/// Verifies that unknown option names are rejected.
#[test]
fn flags_unknown_option_is_rejected() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["flags", "14", "--target-os", "Linux", "-o", "use_lld=True"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown option 'use_lld'"));
}

/// Verifies that out-of-range compression levels are rejected.
#[test]
fn flags_compression_level_out_of_range() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["flags", "14", "--target-os", "Linux", "-o", "lto_compression_level=20"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("0-19"));
}

/// Verifies native gc-section flags for a macOS target in JSON form.
#[test]
fn flags_native_macos_json() {
    let fx = Fixture::new();

    let output = fx
        .mgt()
        .args(["flags", "14", "--target-os", "Macos", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let flags: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(flags["link"], serde_json::json!(["-Wl,-dead_strip"]));
    assert_eq!(
        flags["compile"],
        serde_json::json!(["-ffunction-sections", "-fdata-sections"])
    );
}

/// Verifies that a version without the ARM toolchain is unsupported for ARM targets.
#[test]
fn flags_version_without_kind_exits_with_unsupported() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["flags", "15", "--target-os", "Linux"])
        .assert()
        .code(2);
}

// =============================================================================
// Install Command
// =============================================================================

/// Verifies a full install from a `file://` artifact.
///
/// **Expected behavior**: The root is printed, contains the unpacked
/// executables and is listed afterwards.
#[test]
fn install_publishes_verified_toolchain() {
    let fx = Fixture::new();
    let root = fx.toolchain_root("arm-none-eabi", "14");

    fx.mgt()
        .args(["install", "14", "--kind", "arm-none-eabi"])
        .args(["--build-os", "Linux", "--build-arch", "x86_64"])
        .assert()
        .success()
        .stdout(predicate::str::contains(root.display().to_string()));

    assert!(root.join("bin").join("arm-none-eabi-gcc").is_file());
    assert!(root.join("share/doc/README").is_file());
    assert_eq!(
        std::fs::read(root.join("arm-none-eabi/bin/gcc")).unwrap(),
        b"#!/bin/sh\necho arm-none-eabi-gcc\n"
    );
    #[cfg(unix)]
    assert_eq!(
        std::fs::read_link(root.join("bin/arm-none-eabi-c++")).unwrap(),
        Path::new("arm-none-eabi-g++")
    );
    assert!(root.join(".metadata.json").is_file());

    fx.mgt()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("arm-none-eabi"))
        .stdout(predicate::str::contains("14"));
}

/// Verifies that a second install reuses the published toolchain.
#[test]
fn install_twice_reuses_cache() {
    let fx = Fixture::new();
    let install = |fx: &Fixture| {
        fx.mgt()
            .args(["install", "14", "--kind", "arm-none-eabi"])
            .args(["--build-os", "Windows", "--build-arch", "x86_64"])
            .assert()
            .success();
    };

    install(&fx);
    std::fs::remove_file(&fx.archive).unwrap();

    fx.mgt()
        .args(["install", "14", "--kind", "arm-none-eabi"])
        .args(["--build-os", "Windows", "--build-arch", "x86_64"])
        .assert()
        .success()
        .stderr(predicate::str::contains("already installed"));
}

/// Verifies that a corrupted artifact fails verification.
///
/// **Expected behavior**: Exit with code 3 and leave no toolchain root and no
/// downloaded bytes behind.
#[test]
fn install_corrupted_artifact_exits_with_code_3() {
    let fx = Fixture::new();
    fx.corrupt_archive();

    fx.mgt()
        .args(["install", "14", "--kind", "arm-none-eabi"])
        .args(["--build-os", "Linux", "--build-arch", "x86_64"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("integrity check failed"));

    assert!(!fx.toolchain_root("arm-none-eabi", "14").exists());
    let leftovers = std::fs::read_dir(fx.home().join("downloads"))
        .map(Iterator::count)
        .unwrap_or(0);
    assert_eq!(leftovers, 0);

    fx.mgt()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No toolchains installed"));
}

/// Verifies that `local_path` bypasses resolution, download and verification.
#[test]
fn install_local_path_skips_download() {
    let fx = Fixture::new();
    let local = fx.temp.child("my-gcc");
    local.child("bin").create_dir_all().unwrap();

    fx.mgt()
        .args(["install", "14", "--kind", "native"])
        .args(["--build-os", "Macos", "--build-arch", "armv8"])
        .arg("-o")
        .arg(format!("local_path={}", local.path().display()))
        .assert()
        .success()
        .stdout(predicate::str::contains(local.path().display().to_string()));

    assert!(!fx.home().join("toolchains").exists());
}

/// Verifies that installing for an unsupported build platform exits with 2.
#[test]
fn install_unsupported_platform_exits_with_code_2() {
    let fx = Fixture::new();

    fx.mgt()
        .args(["install", "14", "--kind", "native"])
        .args(["--build-os", "Windows", "--build-arch", "armv8"])
        .assert()
        .code(2);

    assert!(!fx.home().join("downloads").exists());
}

// =============================================================================
// List and Catalog Commands
// =============================================================================

/// Verifies that `mgt list` succeeds on an empty cache.
#[test]
fn list_shows_no_toolchains_message() {
    let temp = assert_fs::TempDir::new().unwrap();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mgt"));
    cmd.env("MGT_HOME", temp.path()).arg("list");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No toolchains installed"));
}

/// Verifies that `mgt catalog` shows versions, kinds and LTO defaults.
#[test]
fn catalog_lists_versions_and_kinds() {
    let fx = Fixture::new();

    fx.mgt()
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("14 (source 14.2.rel1)"))
        .stdout(predicate::str::contains("15 (source 15.1.rel1)"))
        .stdout(predicate::str::contains("native"))
        .stdout(predicate::str::contains("lto=false"))
        .stdout(predicate::str::contains("lto=true"));
}

/// Verifies that an invalid catalog is rejected at load time.
#[test]
fn catalog_with_empty_url_is_rejected() {
    let fx = Fixture::new();
    fx.temp
        .child("catalog.toml")
        .write_str(&format!(
            "[versions.\"14\"]\nsource = \"s\"\n[sources.s.native.Linux.x86_64]\nurl = \"\"\nsha256 = \"{}\"\n",
            "a".repeat(64)
        ))
        .unwrap();

    fx.mgt()
        .arg("catalog")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("url is empty"));
}

// =============================================================================
// Create Command
// =============================================================================

/// Verifies the full package flow for a Cortex-M4F tool requirement.
///
/// **Expected behavior**: The ARM toolchain is installed and the package
/// information names the cross tools, CMake cross settings and flags.
#[test]
fn create_build_require_writes_package_info() {
    let fx = Fixture::new();
    let build = fx.temp.child("linux.profile");
    build
        .write_str(
            "[settings]\nos=Linux\narch=x86_64\n\n\
             [options]\n*:shared=False\nmultiarch-gnu-toolchain/*:lto=True\n",
        )
        .unwrap();
    let host = fx.temp.child("cortex-m4f.profile");
    host.write_str(
        "# host\n[settings]\nos=baremetal\narch=cortex-m4f\nbuild_type=MinSizeRel\n\n\
         [tool_requires]\n*: multiarch-gnu-toolchain/14\n",
    )
    .unwrap();
    let output = fx.temp.child("package.json");

    fx.mgt()
        .args(["create", "14", "--build-require"])
        .arg("--profile-build")
        .arg(build.path())
        .arg("--profile-host")
        .arg(host.path())
        .arg("--output")
        .arg(output.path())
        .assert()
        .success();

    output.assert(predicate::path::is_file());
    let info: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output.path()).unwrap()).unwrap();

    assert_eq!(info["kind"], "arm-none-eabi");
    assert_eq!(info["build_require"], true);
    assert_eq!(info["compiler_executables"]["c"], "arm-none-eabi-gcc");
    assert_eq!(info["build_env"]["OBJCOPY"], "arm-none-eabi-objcopy");
    assert_eq!(info["cmake"]["system_name"], "Generic");
    assert_eq!(info["can_run"], false);
    assert_eq!(info["options"]["lto"], true);

    let compile: Vec<&str> = info["flags"]["compile"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f.as_str())
        .collect();
    assert_eq!(&compile[..5], ["-mcpu=cortex-m4", "-mfloat-abi=hard", "-mfpu=fpv4-sp-d16", "-Os", "-flto"]);

    assert!(fx.toolchain_root("arm-none-eabi", "14").join("bin").is_dir());
}

/// Verifies that an unknown option aimed at this package is still rejected.
#[test]
fn create_scoped_unknown_option_is_rejected() {
    let fx = Fixture::new();
    let host = fx.temp.child("host.profile");
    host.write_str("[settings]\nos=Linux\n\n[options]\nmultiarch-gnu-toolchain/*:shared=False\n")
        .unwrap();

    let build = fx.temp.child("linux.profile");
    build.write_str("[settings]\nos=Linux\narch=x86_64\n").unwrap();

    fx.mgt()
        .args(["create", "14", "--profile-build"])
        .arg(build.path())
        .arg("--profile-host")
        .arg(host.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown option 'shared'"));
}

/// Verifies that a malformed profile is reported with its line number.
#[test]
fn create_malformed_profile_shows_error() {
    let fx = Fixture::new();
    let host = fx.temp.child("bad.profile");
    host.write_str("[settings]\nos baremetal\n").unwrap();

    fx.mgt()
        .args(["create", "14", "--build-require", "--profile-host"])
        .arg(host.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("line 2"));
}

/// Verifies that a tool requirement for an unknown core fails with exit code 4.
#[test]
fn create_unknown_architecture_exits_with_code_4() {
    let fx = Fixture::new();
    let build = fx.temp.child("linux.profile");
    build.write_str("[settings]\nos=Linux\narch=x86_64\n").unwrap();
    let host = fx.temp.child("m99.profile");
    host.write_str("[settings]\nos=baremetal\narch=cortex-m99\n").unwrap();

    fx.mgt()
        .args(["create", "14", "--build-require"])
        .arg("--profile-build")
        .arg(build.path())
        .arg("--profile-host")
        .arg(host.path())
        .assert()
        .code(4);

    assert!(!fx.home().join("toolchains").exists());
}
