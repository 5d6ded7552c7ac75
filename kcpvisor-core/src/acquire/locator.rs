//! Installed binary discovery
//!
//! Looks for `client_<os>_<arch>` in the install directory and checks that it
//! answers the `-v` version probe before it is trusted.

use crate::error::LocateError;
use crate::types::Platform;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Version flag understood by the kcptun client
const VERSION_FLAG: &str = "-v";

/// A binary that passed the version probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedBinary {
    pub path: PathBuf,
    pub version: String,
}

/// Finds a previously installed kcptun client
#[derive(Debug, Clone)]
pub struct BinaryLocator {
    install_dir: PathBuf,
    platform: Platform,
    probe_timeout: Duration,
}

impl BinaryLocator {
    pub fn new(install_dir: impl Into<PathBuf>, platform: Platform, probe_timeout: Duration) -> Self {
        Self {
            install_dir: install_dir.into(),
            platform,
            probe_timeout,
        }
    }

    /// Where the client binary is expected for this platform
    pub fn expected_path(&self) -> PathBuf {
        self.install_dir.join(self.platform.binary_name())
    }

    /// Locate and validate the installed binary
    ///
    /// `NotFound` and `Validation` are both recoverable; callers fall back to
    /// fetching a fresh release.
    #[tracing::instrument(skip(self), fields(install_dir = %self.install_dir.display()))]
    pub async fn locate(&self) -> Result<LocatedBinary, LocateError> {
        let path = self.expected_path();

        match tokio::fs::File::open(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No binary at {:?}", path);
                return Err(LocateError::NotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => {
                return Err(LocateError::Validation {
                    path: path.display().to_string(),
                    reason: format!("cannot open: {}", e),
                });
            }
        }

        let version = probe_version(&path, self.probe_timeout).await?;
        info!("Found kcptun client {:?}: {}", path, version);

        Ok(LocatedBinary { path, version })
    }
}

/// Run `<binary> -v` and return its trimmed output
async fn probe_version(path: &Path, timeout: Duration) -> Result<String, LocateError> {
    let validation = |reason: String| LocateError::Validation {
        path: path.display().to_string(),
        reason,
    };

    let mut command = Command::new(path);
    command
        .arg(VERSION_FLAG)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| validation(format!("version probe timed out after {:?}", timeout)))?
        .map_err(|e| validation(format!("cannot execute: {}", e)))?;

    if !output.status.success() {
        return Err(validation(format!(
            "version probe exited with {}",
            output.status
        )));
    }

    let mut version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if version.is_empty() {
        version = String::from_utf8_lossy(&output.stderr).trim().to_string();
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Arch, Os};

    #[test]
    fn test_expected_path_encodes_platform() {
        let locator = BinaryLocator::new(
            "/opt/kcptun/bin",
            Platform::new(Os::Windows, Arch::Amd64),
            Duration::from_secs(1),
        );
        assert_eq!(
            locator.expected_path(),
            PathBuf::from("/opt/kcptun/bin/client_windows_amd64.exe")
        );
    }

    #[tokio::test]
    async fn test_locate_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let locator = BinaryLocator::new(
            dir.path(),
            Platform::new(Os::Linux, Arch::Amd64),
            Duration::from_secs(1),
        );

        let err = locator.locate().await.unwrap_err();
        assert!(matches!(err, LocateError::NotFound { .. }));
    }
}
