//! Platform detection for picking a prebuilt engine artifact

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    MacOs,
    Linux,
    Windows,
    Other,
}

impl OsFamily {
    /// Map a `std::env::consts::OS` value
    pub fn from_os_str(os: &str) -> Self {
        match os {
            "macos" => Self::MacOs,
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }
}

/// CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    Arm64,
    Other,
}

impl Arch {
    /// Map a `std::env::consts::ARCH` value
    pub fn from_arch_str(arch: &str) -> Self {
        match arch {
            "x86_64" => Self::X64,
            "aarch64" => Self::Arm64,
            _ => Self::Other,
        }
    }
}

/// The (OS, architecture) pair an artifact is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformKey {
    pub os: OsFamily,
    pub arch: Arch,
}

impl PlatformKey {
    pub fn new(os: OsFamily, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// The platform this process was compiled for
    pub fn current() -> Self {
        Self::new(
            OsFamily::from_os_str(std::env::consts::OS),
            Arch::from_arch_str(std::env::consts::ARCH),
        )
    }

    /// Subdirectory holding the prebuilt artifact, if this platform has one
    pub fn prebuilt_dir(&self) -> Option<&'static str> {
        match (self.os, self.arch) {
            (OsFamily::MacOs, Arch::X64) => Some("osx-x64"),
            (OsFamily::MacOs, Arch::Arm64) => Some("osx-arm64"),
            (OsFamily::Linux, Arch::X64) => Some("linux-x64"),
            (OsFamily::Linux, Arch::Arm64) => Some("linux-arm64"),
            (OsFamily::Windows, Arch::X64) => Some("win-x64"),
            (OsFamily::Windows, Arch::Arm64) => Some("win-arm64"),
            _ => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        self.prebuilt_dir().is_some()
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.os, self.arch)
    }
}
