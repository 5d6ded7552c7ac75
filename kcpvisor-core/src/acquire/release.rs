//! Release download
//!
//! Fetches the latest release listing, picks the archive for this platform,
//! downloads it into the install directory and unpacks the client binary.

use crate::acquire::extract::extract_tar_gz;
use crate::error::{ExtractError, FetchError, KcpvisorError};
use crate::sink::SharedSink;
use crate::types::Platform;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Release listing as returned by the GitHub releases API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseMetadata {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl ReleaseMetadata {
    /// Parse the JSON body of a release listing
    pub fn from_json(body: &[u8]) -> Result<Self, FetchError> {
        serde_json::from_slice(body).map_err(|e| FetchError::Decode {
            reason: e.to_string(),
        })
    }

    /// First asset whose name contains `marker`
    pub fn select_asset(&self, marker: &str) -> Result<&ReleaseAsset, FetchError> {
        self.assets
            .iter()
            .find(|asset| asset.name.contains(marker))
            .ok_or_else(|| FetchError::NoMatchingAsset {
                marker: marker.to_string(),
                tag: self.tag_name.clone(),
            })
    }
}

/// Downloads and installs kcptun client releases
#[derive(Debug, Clone)]
pub struct ReleaseFetcher {
    client: Client,
    release_url: String,
    install_dir: PathBuf,
    platform: Platform,
    binary_marker: String,
    timeout: Duration,
    sink: SharedSink,
}

impl ReleaseFetcher {
    /// Create a fetcher
    ///
    /// # Arguments
    /// * `release_url` - release listing endpoint
    /// * `install_dir` - where archives are stored and unpacked
    /// * `platform` - selects the release asset
    /// * `binary_marker` - identifies the client inside the archive
    /// * `timeout` - upper bound for each HTTP request, body included
    /// * `sink` - receives progress lines
    pub fn new(
        release_url: impl Into<String>,
        install_dir: impl Into<PathBuf>,
        platform: Platform,
        binary_marker: impl Into<String>,
        timeout: Duration,
        sink: SharedSink,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kcpvisor/", env!("CARGO_PKG_VERSION")))
            .use_rustls_tls()
            .build()
            .map_err(|e| FetchError::Http {
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            release_url: release_url.into(),
            install_dir: install_dir.into(),
            platform,
            binary_marker: binary_marker.into(),
            timeout,
            sink,
        })
    }

    /// Fetch, download and unpack the latest release
    ///
    /// Returns the path of the installed client binary.
    #[tracing::instrument(skip(self), fields(url = %self.release_url, platform = %self.platform))]
    pub async fn acquire(&self) -> Result<PathBuf, KcpvisorError> {
        let marker = self.platform.asset_marker();

        self.sink.append_line("[fetch] fetching latest release...");
        let release = self.fetch_metadata().await?;
        self.sink
            .append_line(&format!("[fetch] latest version is {}", release.tag_name));

        let asset = release.select_asset(&marker)?;
        let archive = self.download_asset(asset).await?;
        self.sink
            .append_line(&format!("[fetch] downloaded {}", asset.name));

        self.sink
            .append_line(&format!("[fetch] decompressing {}", asset.name));
        let binary = self.unpack(&archive).await?;
        set_executable(&binary).await?;
        self.sink.append_line("[fetch] decompressed");

        info!(release = %release.tag_name, "Installed kcptun client at {:?}", binary);
        Ok(binary)
    }

    /// Fetch and parse the release listing
    pub async fn fetch_metadata(&self) -> Result<ReleaseMetadata, FetchError> {
        let response = self
            .client
            .get(&self.release_url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if response.status() != StatusCode::OK {
            warn!(status = %response.status(), "Release listing request failed");
            return Err(FetchError::Status {
                status: response.status().to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.request_error(e))?;
        let release = ReleaseMetadata::from_json(&body)?;
        debug!(
            tag = %release.tag_name,
            assets = release.assets.len(),
            "Fetched release listing"
        );
        Ok(release)
    }

    /// Download an asset into the install directory
    ///
    /// Nothing is written to disk unless the server answers 200.
    pub async fn download_asset(&self, asset: &ReleaseAsset) -> Result<PathBuf, FetchError> {
        if asset.browser_download_url.is_empty() {
            return Err(FetchError::Http {
                reason: format!("asset {} has no download URL", asset.name),
            });
        }

        let file_name = Path::new(&asset.name)
            .file_name()
            .ok_or_else(|| FetchError::Decode {
                reason: format!("invalid asset name {:?}", asset.name),
            })?;

        let mut response = self
            .client
            .get(&asset.browser_download_url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if response.status() != StatusCode::OK {
            warn!(status = %response.status(), asset = %asset.name, "Asset download failed");
            return Err(FetchError::Status {
                status: response.status().to_string(),
            });
        }

        tokio::fs::create_dir_all(&self.install_dir)
            .await
            .map_err(|e| write_error(&self.install_dir, e))?;

        let path = self.install_dir.join(file_name);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| write_error(&path, e))?;

        let mut written: u64 = 0;
        let copied: Result<(), FetchError> = async {
            while let Some(chunk) = response.chunk().await.map_err(|e| self.request_error(e))? {
                file.write_all(&chunk)
                    .await
                    .map_err(|e| write_error(&path, e))?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(|e| write_error(&path, e))
        }
        .await;

        if let Err(e) = copied {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        debug!(bytes = written, "Downloaded {:?}", path);
        Ok(path)
    }

    /// Unpack a downloaded archive on the blocking pool
    async fn unpack(&self, archive: &Path) -> Result<PathBuf, KcpvisorError> {
        let archive = archive.to_path_buf();
        let install_dir = self.install_dir.clone();
        let marker = self.binary_marker.clone();

        let result = tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(&archive).map_err(|e| ExtractError::Io {
                path: archive.display().to_string(),
                source: e,
            })?;
            extract_tar_gz(file, &install_dir, &marker)
        })
        .await
        .map_err(|e| KcpvisorError::Io(std::io::Error::other(e)))?;

        Ok(result?)
    }

    fn request_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            FetchError::Http {
                reason: e.to_string(),
            }
        }
    }
}

fn write_error(path: &Path, e: std::io::Error) -> FetchError {
    FetchError::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Mark the binary executable on Unix platforms
async fn set_executable(path: &Path) -> Result<(), KcpvisorError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
