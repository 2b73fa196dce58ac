//! ARM Cortex-M target architecture descriptors.
//!
//! A target architecture name such as `cortex-m7d` is the base core name
//! (`cortex-m7`) optionally followed by a precision suffix: `f` for a
//! single-precision FPU, `d` for a double-precision FPU. A suffix implies the
//! hard-float ABI; no suffix means soft-float.
//!
//! The core table below is the only source of truth. A name parses if and only
//! if its base core is listed and, when a suffix is present, the core carries
//! an FPU of that precision.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::ToolchainError;

/// Floating-point calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatAbi {
    Soft,
    Hard,
}

impl FloatAbi {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

/// FPU precision encoded by the architecture name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    Double,
}

impl Precision {
    /// The name suffix for this precision.
    #[must_use]
    pub fn suffix(self) -> char {
        match self {
            Self::Single => 'f',
            Self::Double => 'd',
        }
    }

    fn from_suffix(c: char) -> Option<Self> {
        match c {
            'f' => Some(Self::Single),
            'd' => Some(Self::Double),
            _ => None,
        }
    }
}

/// A Cortex-M core and the FPUs GCC should be told about for it.
#[derive(Debug, PartialEq, Eq)]
pub struct Core {
    /// Value passed to `-mcpu=`.
    pub name: &'static str,
    /// `-mfpu=` value for the single-precision variant, if one exists.
    pub single_fpu: Option<&'static str>,
    /// `-mfpu=` value for the double-precision variant, if one exists.
    pub double_fpu: Option<&'static str>,
}

impl Core {
    const fn integer(name: &'static str) -> Self {
        Self {
            name,
            single_fpu: None,
            double_fpu: None,
        }
    }

    fn fpu(&self, precision: Precision) -> Option<&'static str> {
        match precision {
            Precision::Single => self.single_fpu,
            Precision::Double => self.double_fpu,
        }
    }
}

/// Cores supported by the `arm-none-eabi` toolchain.
pub static CORES: &[Core] = &[
    Core::integer("cortex-m0"),
    Core::integer("cortex-m0plus"),
    Core::integer("cortex-m1"),
    Core::integer("cortex-m3"),
    Core {
        name: "cortex-m4",
        single_fpu: Some("fpv4-sp-d16"),
        double_fpu: None,
    },
    Core {
        name: "cortex-m7",
        single_fpu: Some("fpv5-sp-d16"),
        double_fpu: Some("fpv5-d16"),
    },
    Core::integer("cortex-m23"),
    Core {
        name: "cortex-m33",
        single_fpu: Some("fpv5-sp-d16"),
        double_fpu: None,
    },
    Core {
        name: "cortex-m35p",
        single_fpu: Some("fpv5-sp-d16"),
        double_fpu: None,
    },
    Core::integer("cortex-m55"),
    Core::integer("cortex-m85"),
];

fn find_core(name: &str) -> Option<&'static Core> {
    CORES.iter().find(|core| core.name == name)
}

/// Every architecture name accepted by [`ArchDescriptor::parse`], in table order.
#[must_use]
pub fn supported_architectures() -> Vec<String> {
    let mut names = Vec::new();
    for core in CORES {
        names.push(core.name.to_string());
        for precision in [Precision::Single, Precision::Double] {
            if core.fpu(precision).is_some() {
                names.push(format!("{}{}", core.name, precision.suffix()));
            }
        }
    }
    names
}

/// Returns whether `name` is a supported Cortex-M architecture.
#[must_use]
pub fn is_supported(name: &str) -> bool {
    ArchDescriptor::parse(name).is_ok()
}

/// A decomposed target architecture name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchDescriptor {
    core: &'static Core,
    precision: Option<Precision>,
}

impl ArchDescriptor {
    /// Decomposes an architecture name into core, float ABI and precision.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::UnknownArchitecture`] when the base core is
    /// not in [`CORES`] or the core has no FPU of the requested precision.
    pub fn parse(name: &str) -> Result<Self, ToolchainError> {
        if let Some(core) = find_core(name) {
            return Ok(Self {
                core,
                precision: None,
            });
        }

        let mut chars = name.chars();
        let precision = chars.next_back().and_then(Precision::from_suffix);
        if let Some(precision) = precision
            && let Some(core) = find_core(chars.as_str())
            && core.fpu(precision).is_some()
        {
            return Ok(Self {
                core,
                precision: Some(precision),
            });
        }

        Err(ToolchainError::unknown_architecture(name))
    }

    /// Base core name, as passed to `-mcpu=`.
    #[must_use]
    pub fn core(&self) -> &'static str {
        self.core.name
    }

    #[must_use]
    pub fn precision(&self) -> Option<Precision> {
        self.precision
    }

    #[must_use]
    pub fn float_abi(&self) -> FloatAbi {
        if self.precision.is_some() {
            FloatAbi::Hard
        } else {
            FloatAbi::Soft
        }
    }

    /// The `-mfpu=` value, present only for hard-float variants.
    #[must_use]
    pub fn fpu(&self) -> Option<&'static str> {
        self.precision.and_then(|p| self.core.fpu(p))
    }

    /// `-mcpu`, `-mfloat-abi` and (for hard-float) `-mfpu`, in that order.
    #[must_use]
    pub fn flags(&self) -> Vec<String> {
        let mut flags = vec![
            format!("-mcpu={}", self.core()),
            format!("-mfloat-abi={}", self.float_abi().as_str()),
        ];
        if let Some(fpu) = self.fpu() {
            flags.push(format!("-mfpu={fpu}"));
        }
        flags
    }
}

impl FromStr for ArchDescriptor {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ArchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.core())?;
        if let Some(precision) = self.precision {
            write!(f, "{}", precision.suffix())?;
        }
        Ok(())
    }
}
