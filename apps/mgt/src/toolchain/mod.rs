//! Toolchain resolution and installation.
//!
//! A toolchain is identified by its kind (`native` or `arm-none-eabi`) and a
//! catalog version. Resolution maps that pair plus the build platform to a
//! single download source; acquisition turns the source into a verified
//! toolchain root on disk.
//!
//! ## Module Structure
//!
//! - [`platform`] - Build OS and architecture
//! - [`kind`] - Toolchain kinds and kind selection
//! - [`catalog`] - Version catalog and source table
//! - [`resolver`] - Source lookup
//! - [`download`] - HTTP and `file://` download with progress
//! - [`verify`] - SHA256 checksum verification
//! - [`archive`] - tar.xz, tar.gz and ZIP extraction
//! - [`layout`] - Post-extraction layout fixups
//! - [`paths`] - Cache directory layout
//! - [`acquire`] - Download, verify, unpack and publish

pub mod acquire;
pub mod archive;
pub mod catalog;
pub mod download;
pub mod kind;
pub mod layout;
pub mod paths;
pub mod platform;
pub mod resolver;
pub mod verify;

pub use acquire::{AcquireRequest, Acquired, Origin, acquire, use_local};
pub use catalog::{Catalog, SourceEntry};
pub use kind::{BAREMETAL_OS, ToolchainKind};
pub use paths::ToolchainPaths;
pub use platform::{Arch, Os, Platform};
pub use resolver::{ensure_kind, resolve_for_platform, resolve_source};
