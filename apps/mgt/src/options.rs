//! Package options that shape toolchain acquisition and emitted flags.
//!
//! Options arrive as `name=value` strings (command line `-o`, profile
//! `[options]` sections) and are folded into a typed [`Options`] record.
//! Unknown names and malformed values are rejected immediately rather than
//! being carried around as strings.

use std::path::PathBuf;

use serde::Serialize;

use crate::errors::ToolchainError;
use crate::toolchain::{Catalog, ToolchainKind};

/// Highest accepted `lto_compression_level` (zstd's maximum).
pub const MAX_LTO_COMPRESSION_LEVEL: u8 = 19;

/// Every option name the package understands.
pub const OPTION_NAMES: [&str; 9] = [
    "local_path",
    "default_arch",
    "lto",
    "fat_lto",
    "function_sections",
    "data_sections",
    "gc_sections",
    "default_libc",
    "lto_compression_level",
];

/// Typed package options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Options {
    /// Use an existing toolchain installation instead of downloading one.
    pub local_path: Option<PathBuf>,
    /// Inject `-mcpu`/`-mfloat-abi`/`-mfpu` for ARM targets.
    pub default_arch: bool,
    pub lto: bool,
    /// Emit both LTO bytecode and machine code into objects. Ignored without `lto`.
    pub fat_lto: bool,
    pub function_sections: bool,
    pub data_sections: bool,
    /// Garbage-collect unused sections at link time.
    pub gc_sections: bool,
    /// Link ARM targets against the `nosys` newlib stubs.
    pub default_libc: bool,
    pub lto_compression_level: u8,
}

impl Options {
    /// Defaults with an explicit LTO setting.
    #[must_use]
    pub fn with_lto(lto: bool) -> Self {
        Self {
            local_path: None,
            default_arch: true,
            lto,
            fat_lto: true,
            function_sections: true,
            data_sections: true,
            gc_sections: true,
            default_libc: true,
            lto_compression_level: 0,
        }
    }

    /// Defaults for a catalog version and toolchain kind.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnknownVersion`] if the version is absent.
    pub fn defaults(
        catalog: &Catalog,
        version: &str,
        kind: ToolchainKind,
    ) -> Result<Self, ToolchainError> {
        Ok(Self::with_lto(catalog.lto_default(version, kind)?))
    }

    /// Sets one option from its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::InvalidOption`] for unknown names, values
    /// that are not booleans where one is expected, and compression levels
    /// outside `0..=19`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ToolchainError> {
        let value = value.trim();
        match name.trim() {
            "local_path" => {
                self.local_path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "default_arch" => self.default_arch = parse_bool(name, value)?,
            "lto" => self.lto = parse_bool(name, value)?,
            "fat_lto" => self.fat_lto = parse_bool(name, value)?,
            "function_sections" => self.function_sections = parse_bool(name, value)?,
            "data_sections" => self.data_sections = parse_bool(name, value)?,
            "gc_sections" => self.gc_sections = parse_bool(name, value)?,
            "default_libc" => self.default_libc = parse_bool(name, value)?,
            "lto_compression_level" => self.lto_compression_level = parse_level(value)?,
            other => {
                return Err(ToolchainError::invalid_option(format!(
                    "unknown option '{other}' (known options: {})",
                    OPTION_NAMES.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Applies `(name, value)` pairs in order; later values win.
    ///
    /// # Errors
    ///
    /// Stops at the first pair [`Options::set`] rejects.
    pub fn apply<'a, I>(&mut self, assignments: I) -> Result<(), ToolchainError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in assignments {
            self.set(name, value)?;
        }
        Ok(())
    }
}

/// Splits a `NAME=VALUE` command line assignment.
///
/// # Errors
///
/// Returns [`ToolchainError::InvalidOption`] when there is no `=` or the
/// name is empty.
pub fn parse_assignment(s: &str) -> Result<(String, String), ToolchainError> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ToolchainError::invalid_option(format!(
            "expected NAME=VALUE, got '{s}'"
        ))),
    }
}

/// Accepts the spellings Conan uses for boolean options.
fn parse_bool(name: &str, value: &str) -> Result<bool, ToolchainError> {
    match value {
        "True" | "true" | "1" => Ok(true),
        "False" | "false" | "0" => Ok(false),
        _ => Err(ToolchainError::invalid_option(format!(
            "{name} must be True or False, got '{value}'"
        ))),
    }
}

fn parse_level(value: &str) -> Result<u8, ToolchainError> {
    let level: i64 = value.parse().map_err(|_| {
        ToolchainError::invalid_option(format!(
            "lto_compression_level must be an integer, got '{value}'"
        ))
    })?;
    u8::try_from(level)
        .ok()
        .filter(|l| *l <= MAX_LTO_COMPRESSION_LEVEL)
        .ok_or_else(|| {
            ToolchainError::invalid_option(format!(
                "lto_compression_level must be between 0-{MAX_LTO_COMPRESSION_LEVEL}, got {level}"
            ))
        })
}
