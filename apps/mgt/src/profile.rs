//! Conan-style profile documents.
//!
//! Only the sections that select a toolchain are interpreted:
//!
//! ```text
//! [settings]
//! os=baremetal
//! arch=cortex-m4f
//! build_type=MinSizeRel
//!
//! [options]
//! multiarch-gnu-toolchain/*:lto=True
//!
//! [tool_requires]
//! *: multiarch-gnu-toolchain/14
//!
//! [conf]
//! tools.build:verbosity=quiet
//! ```
//!
//! Other sections (`[buildenv]`, `[runenv]`, ...) are skipped. Lines starting
//! with `#` and blank lines are ignored everywhere.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::errors::ToolchainError;
use crate::options::OPTION_NAMES;

/// An option assignment, optionally scoped to a package pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    /// Package pattern before the `:`, e.g. `multiarch-gnu-toolchain/*`.
    pub pattern: Option<String>,
    pub name: String,
    pub value: String,
}

impl OptionEntry {
    /// Whether this entry applies to the package `name/version`.
    ///
    /// Unscoped entries apply to the consumer, which is this package when it
    /// is created directly.
    #[must_use]
    pub fn applies_to(&self, name: &str, version: &str) -> bool {
        let Some(pattern) = self.pattern.as_deref() else {
            return true;
        };
        let reference = format!("{name}/{version}");
        match pattern.strip_suffix('*') {
            Some(prefix) => reference.starts_with(prefix),
            None => pattern == name || pattern == reference,
        }
    }

    /// Whether the pattern matches packages in general rather than naming
    /// `name` itself, e.g. `*` or `*/*`.
    #[must_use]
    pub fn is_wildcard_for(&self, name: &str) -> bool {
        self.pattern
            .as_deref()
            .is_some_and(|pattern| !pattern.starts_with(name))
    }
}

/// A parsed profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// File the profile was read from, for diagnostics.
    pub path: PathBuf,
    pub settings: BTreeMap<String, String>,
    pub options: Vec<OptionEntry>,
    pub tool_requires: Vec<String>,
    pub conf: BTreeMap<String, String>,
}

#[derive(Clone, Copy)]
enum Section {
    Settings,
    Options,
    ToolRequires,
    Conf,
    Ignored,
}

impl Profile {
    /// Reads and parses a profile file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        Ok(Self::parse(&content, path)?)
    }

    /// Parses profile text. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::ProfileError`] for content before the first
    /// section header, `include()` or template directives, and `key=value`
    /// lines without a key.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ToolchainError> {
        let mut profile = Self {
            path: path.to_path_buf(),
            ..Self::default()
        };
        let mut section = None;

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let error = |message: String| ToolchainError::profile(path, format!("line {line_no}: {message}"));

            if line.starts_with("include(") || line.starts_with("{%") || line.starts_with("{{") {
                return Err(error(format!("unsupported directive '{line}'")));
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = Some(match name.trim() {
                    "settings" => Section::Settings,
                    "options" => Section::Options,
                    "tool_requires" | "build_requires" => Section::ToolRequires,
                    "conf" => Section::Conf,
                    other => {
                        tracing::debug!(section = other, path = %path.display(), "skipping profile section");
                        Section::Ignored
                    }
                });
                continue;
            }

            let Some(current) = section else {
                return Err(error(format!("'{line}' appears before any [section]")));
            };

            match current {
                Section::Settings => {
                    let (key, value) = split_key_value(line).map_err(error)?;
                    profile.settings.insert(key.to_string(), value.to_string());
                }
                Section::Options => {
                    let (key, value) = split_key_value(line).map_err(error)?;
                    let (pattern, name) = match key.rsplit_once(':') {
                        Some((pattern, name)) => (Some(pattern.trim().to_string()), name.trim()),
                        None => (None, key),
                    };
                    profile.options.push(OptionEntry {
                        pattern,
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                Section::ToolRequires => profile.tool_requires.push(line.to_string()),
                Section::Conf => {
                    let (key, value) = split_key_value(line).map_err(error)?;
                    profile.conf.insert(key.to_string(), value.to_string());
                }
                Section::Ignored => {}
            }
        }

        Ok(profile)
    }

    /// Looks up a setting such as `os` or `compiler.version`.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn os(&self) -> Option<&str> {
        self.setting("os")
    }

    #[must_use]
    pub fn arch(&self) -> Option<&str> {
        self.setting("arch")
    }

    #[must_use]
    pub fn build_type(&self) -> Option<&str> {
        self.setting("build_type")
    }

    /// Option assignments that apply to the package `name/version`, in file order.
    pub fn options_for<'a>(
        &'a self,
        name: &'a str,
        version: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.options
            .iter()
            .filter(move |entry| entry.applies_to(name, version))
            .filter(move |entry| {
                // Wildcard options only reach packages that declare them.
                let declared = OPTION_NAMES.contains(&entry.name.as_str());
                if !declared && entry.is_wildcard_for(name) {
                    tracing::debug!(
                        option = %entry.name,
                        pattern = entry.pattern.as_deref().unwrap_or_default(),
                        "ignoring wildcard option not declared by this package"
                    );
                }
                declared || !entry.is_wildcard_for(name)
            })
            .map(|entry| (entry.name.as_str(), entry.value.as_str()))
    }
}

fn split_key_value(line: &str) -> Result<(&str, &str), String> {
    match line.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        Some(_) => Err(format!("missing key in '{line}'")),
        None => Err(format!("expected key=value, got '{line}'")),
    }
}
