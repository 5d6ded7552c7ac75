//! Platform identification
//!
//! kcptun publishes one archive per OS/architecture pair and names the client
//! binary inside it `client_<os>_<arch>`. Everything that depends on the host
//! platform goes through [`Platform`] so it can be chosen once and passed in.

use crate::error::FetchError;
use std::fmt;

/// Operating systems kcptun publishes releases for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Windows,
    Linux,
    Darwin,
}

impl Os {
    /// Parse an OS identifier as reported by `std::env::consts::OS`
    pub fn parse(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" | "darwin" => Some(Self::Darwin),
            _ => None,
        }
    }

    /// Name used in release asset and binary names
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::Linux => "linux",
            Os::Darwin => "darwin",
        }
    }

    /// Substring identifying this OS's release asset
    pub fn asset_marker(&self) -> &'static str {
        match self {
            Os::Windows => "-windows-amd64-",
            Os::Linux => "-linux-amd64-",
            Os::Darwin => "-darwin-amd64-",
        }
    }
}

/// CPU architectures kcptun publishes releases for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    /// Parse an architecture identifier as reported by `std::env::consts::ARCH`
    pub fn parse(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" | "amd64" => Some(Self::Amd64),
            "aarch64" | "arm64" => Some(Self::Arm64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

/// Host platform (OS + architecture)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the platform this process was compiled for
    pub fn current() -> Result<Self, FetchError> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build a platform from raw OS/arch identifiers
    ///
    /// Anything outside the published release matrix is `Unsupported`.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self, FetchError> {
        let unsupported = || FetchError::Unsupported {
            os: os.to_string(),
            arch: arch.to_string(),
        };
        let os = Os::parse(os).ok_or_else(unsupported)?;
        let arch = Arch::parse(arch).ok_or_else(unsupported)?;
        Ok(Self { os, arch })
    }

    /// Substring used to pick the release asset for this platform
    ///
    /// amd64 hosts get one of the three fixed OS markers; other architectures
    /// substitute their own name in the same position.
    pub fn asset_marker(&self) -> String {
        match self.arch {
            Arch::Amd64 => self.os.asset_marker().to_string(),
            arch => format!("-{}-{}-", self.os.as_str(), arch.as_str()),
        }
    }

    /// Executable suffix (`.exe` on Windows, empty elsewhere)
    pub fn exe_suffix(&self) -> &'static str {
        match self.os {
            Os::Windows => ".exe",
            _ => "",
        }
    }

    /// File name of the kcptun client binary, e.g. `client_linux_amd64`
    pub fn binary_name(&self) -> String {
        format!(
            "client_{}_{}{}",
            self.os.as_str(),
            self.arch.as_str(),
            self.exe_suffix()
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os.as_str(), self.arch.as_str())
    }
}
