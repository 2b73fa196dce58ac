//! Error types for the mgt CLI.
//!
//! Most functions propagate failures through `anyhow::Result` with context
//! attached. The variants of [`ToolchainError`] are the failures a caller is
//! expected to tell apart: they are raised at the point of detection, travel
//! inside the `anyhow` chain, and are recovered in `main` to pick the process
//! exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for [`ToolchainError::UnsupportedCombination`].
pub const EXIT_UNSUPPORTED: i32 = 2;

/// Exit code for [`ToolchainError::IntegrityError`].
pub const EXIT_INTEGRITY: i32 = 3;

/// Exit code for [`ToolchainError::UnknownArchitecture`].
pub const EXIT_UNKNOWN_ARCH: i32 = 4;

/// Typed failures of toolchain resolution, acquisition and flag computation.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// No catalog entry exists for the requested platform tuple.
    ///
    /// Never retryable: pick a supported platform or pass `local_path`.
    #[error("unsupported combination: {message}")]
    UnsupportedCombination {
        /// Which part of the tuple was rejected.
        message: String,
    },

    /// A downloaded artifact does not hash to the declared checksum.
    #[error("integrity check failed for {}: expected sha256 {expected}, got {actual}", path.display())]
    IntegrityError {
        /// The artifact that was hashed.
        path: PathBuf,
        /// Checksum declared in the catalog.
        expected: String,
        /// Checksum of the bytes on disk.
        actual: String,
    },

    /// A target architecture name does not decompose into a known core.
    #[error(
        "unknown architecture: '{name}' (supported: {})",
        crate::arch::supported_architectures().join(", ")
    )]
    UnknownArchitecture {
        /// The rejected architecture name.
        name: String,
    },

    /// The requested toolchain version is not in the catalog.
    #[error("unknown toolchain version '{version}' (catalog has: {})", available.join(", "))]
    UnknownVersion {
        /// The requested version.
        version: String,
        /// Versions the catalog does declare.
        available: Vec<String>,
    },

    /// An option name or value was rejected while building the options record.
    #[error("invalid option: {message}")]
    InvalidOption {
        /// Description of the rejected option.
        message: String,
    },

    /// The catalog document is malformed or incomplete.
    #[error("catalog error: {message}")]
    CatalogError {
        /// Description of the configuration problem.
        message: String,
    },

    /// A profile document could not be interpreted.
    #[error("profile error in {}: {message}", path.display())]
    ProfileError {
        /// The profile file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Network or transport failure while fetching an artifact.
    #[error("download error: {message}")]
    DownloadError {
        /// Description of the download error.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ToolchainError {
    /// Creates a new `UnsupportedCombination` error.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedCombination {
            message: message.into(),
        }
    }

    /// Creates a new `IntegrityError`.
    #[must_use]
    pub fn integrity(
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::IntegrityError {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `UnknownArchitecture` error.
    #[must_use]
    pub fn unknown_architecture(name: impl Into<String>) -> Self {
        Self::UnknownArchitecture { name: name.into() }
    }

    /// Creates a new `InvalidOption` error.
    #[must_use]
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption {
            message: message.into(),
        }
    }

    /// Creates a new `CatalogError`.
    #[must_use]
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::CatalogError {
            message: message.into(),
        }
    }

    /// Creates a new `ProfileError`.
    #[must_use]
    pub fn profile(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ProfileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `DownloadError`.
    #[must_use]
    pub fn download(message: impl Into<String>) -> Self {
        Self::DownloadError {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `DownloadError` with a source error.
    #[must_use]
    pub fn download_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DownloadError {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Process exit code reported for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::UnsupportedCombination { .. } => EXIT_UNSUPPORTED,
            Self::IntegrityError { .. } => EXIT_INTEGRITY,
            Self::UnknownArchitecture { .. } => EXIT_UNKNOWN_ARCH,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_displays_message() {
        let err = ToolchainError::unsupported("native toolchain 14 for Macos/armv8");
        assert_eq!(
            err.to_string(),
            "unsupported combination: native toolchain 14 for Macos/armv8"
        );
    }

    #[test]
    fn integrity_displays_both_checksums() {
        let err = ToolchainError::integrity("/tmp/gcc.tar.xz", "abc123", "def456");
        assert_eq!(
            err.to_string(),
            "integrity check failed for /tmp/gcc.tar.xz: expected sha256 abc123, got def456"
        );
    }

    #[test]
    fn unknown_architecture_displays_name() {
        let err = ToolchainError::unknown_architecture("cortex-a53");
        let message = err.to_string();
        assert!(message.starts_with("unknown architecture: 'cortex-a53' (supported: cortex-m0, "));
        assert!(message.contains("cortex-m4f"));
    }

    #[test]
    fn unknown_version_lists_available() {
        let err = ToolchainError::UnknownVersion {
            version: "99".to_string(),
            available: vec!["13".to_string(), "14".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "unknown toolchain version '99' (catalog has: 13, 14)"
        );
    }

    #[test]
    fn profile_error_displays_path() {
        let err = ToolchainError::profile("/profiles/host", "line 3 is not key=value");
        assert_eq!(
            err.to_string(),
            "profile error in /profiles/host: line 3 is not key=value"
        );
    }

    #[test]
    fn exit_codes_distinguish_taxonomy() {
        assert_eq!(ToolchainError::unsupported("x").exit_code(), EXIT_UNSUPPORTED);
        assert_eq!(
            ToolchainError::integrity("a", "b", "c").exit_code(),
            EXIT_INTEGRITY
        );
        assert_eq!(
            ToolchainError::unknown_architecture("x").exit_code(),
            EXIT_UNKNOWN_ARCH
        );
        assert_eq!(ToolchainError::invalid_option("x").exit_code(), 1);
        assert_eq!(ToolchainError::download("x").exit_code(), 1);
    }
}
