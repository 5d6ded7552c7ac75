//! Binary acquisition
//!
//! A usable kcptun client comes either from the install directory (validated
//! with a version probe) or from a freshly downloaded release.

pub mod extract;
pub mod locator;
pub mod release;

pub use extract::extract_tar_gz;
pub use locator::{BinaryLocator, LocatedBinary};
pub use release::{ReleaseAsset, ReleaseFetcher, ReleaseMetadata};

use crate::error::KcpvisorError;
use crate::sink::SharedSink;
use std::path::PathBuf;
use tracing::{info, warn};

/// Locate-then-fetch strategy for obtaining the client binary
#[derive(Debug, Clone)]
pub struct BinarySource {
    locator: BinaryLocator,
    fetcher: ReleaseFetcher,
    sink: SharedSink,
}

impl BinarySource {
    pub fn new(locator: BinaryLocator, fetcher: ReleaseFetcher, sink: SharedSink) -> Self {
        Self {
            locator,
            fetcher,
            sink,
        }
    }

    /// Return an installed binary, downloading a release if none is usable
    pub async fn obtain(&self) -> Result<PathBuf, KcpvisorError> {
        match self.locator.locate().await {
            Ok(found) => {
                self.sink
                    .append_line(&format!("[kcptun] version: {}", found.version));
                Ok(found.path)
            }
            Err(e) => {
                warn!("Local binary unusable: {}", e);
                self.sink
                    .append_line("[kcptun] no usable local binary, downloading release");
                let path = self.fetcher.acquire().await?;
                info!("Using downloaded binary {:?}", path);
                Ok(path)
            }
        }
    }

    pub fn locator(&self) -> &BinaryLocator {
        &self.locator
    }

    pub fn fetcher(&self) -> &ReleaseFetcher {
        &self.fetcher
    }
}
