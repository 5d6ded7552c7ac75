//! Configuration module
//!
//! Handles the supervisor settings: where the kcptun client is installed, which
//! tunnel config it is started with, and where releases are fetched from.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub mod toml_config;

/// Default release listing for the kcptun project
pub const DEFAULT_RELEASE_URL: &str = "https://api.github.com/repos/xtaci/kcptun/releases/latest";

/// Substring identifying the client binary inside a release archive
pub const DEFAULT_BINARY_MARKER: &str = "client_";

/// Supervisor configuration
///
/// Relative paths are resolved against `working_dir` (or the process working
/// directory when unset) by [`SupervisorConfig::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Base directory for relative paths
    pub working_dir: Option<PathBuf>,

    /// Directory receiving downloaded archives and extracted files
    pub install_dir: PathBuf,

    /// Tunnel config passed to the client as `-c <config_file>`
    pub config_file: PathBuf,

    /// Release metadata endpoint
    pub release_url: String,

    /// Substring identifying the client binary inside an archive
    pub binary_marker: String,

    /// Upper bound for metadata and asset downloads, in seconds
    pub download_timeout_secs: u64,

    /// Upper bound for the version probe and output draining, in seconds
    pub startup_timeout_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            install_dir: PathBuf::from("bin"),
            config_file: PathBuf::from("config.json"),
            release_url: DEFAULT_RELEASE_URL.to_string(),
            binary_marker: DEFAULT_BINARY_MARKER.to_string(),
            download_timeout_secs: 300,
            startup_timeout_secs: 10,
        }
    }
}

impl SupervisorConfig {
    /// Create a configuration rooted at `working_dir` with default settings
    pub fn with_working_dir(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(working_dir.into()),
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.release_url)
            .map_err(|e| format!("Failed to parse release URL: {}", e))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(format!(
                    "Only HTTP/HTTPS schemes are supported, got: {}",
                    scheme
                ))
            }
        }

        if self.binary_marker.is_empty() {
            return Err("Binary marker cannot be empty".to_string());
        }

        if self.download_timeout_secs == 0 {
            return Err("Download timeout cannot be zero".to_string());
        }

        if self.startup_timeout_secs == 0 {
            return Err("Startup timeout cannot be zero".to_string());
        }

        Ok(())
    }

    /// Resolve every path against the working directory
    pub fn resolve(&self) -> std::io::Result<ResolvedPaths> {
        let working_dir = match &self.working_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => std::env::current_dir()?.join(dir),
            None => std::env::current_dir()?,
        };

        Ok(ResolvedPaths {
            install_dir: join_relative(&working_dir, &self.install_dir),
            config_file: join_relative(&working_dir, &self.config_file),
            working_dir,
        })
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

/// Absolute paths derived from a [`SupervisorConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub working_dir: PathBuf,
    pub install_dir: PathBuf,
    pub config_file: PathBuf,
}

fn join_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
