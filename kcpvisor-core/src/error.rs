//! Error types for the kcpvisor supervisor
//!
//! Each component (locator, fetcher, extractor, supervisor) owns its error
//! enum; `KcpvisorError` ties them together for callers that drive the full
//! start sequence.

use thiserror::Error;

/// Main error type for the kcpvisor application
#[derive(Error, Debug)]
pub enum KcpvisorError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local binary lookup failures
    #[error("Locate error: {0}")]
    Locate(#[from] LocateError),

    /// Release metadata and download failures
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Archive unpacking failures
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Child process lifecycle failures
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Invalid release URL: {url}")]
    InvalidUrl { url: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Binary lookup errors
///
/// Both variants are recoverable: the caller falls back to fetching a release.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("Binary not found at {path}")]
    NotFound { path: String },

    #[error("Binary at {path} failed version check: {reason}")]
    Validation { path: String, reason: String },
}

/// Release metadata and download errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Unsupported platform: {os}/{arch}")]
    Unsupported { os: String, arch: String },

    #[error("HTTP request failed: {reason}")]
    Http { reason: String },

    #[error("Unexpected HTTP status: {status}")]
    Status { status: String },

    #[error("Request timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Failed to decode release metadata: {reason}")]
    Decode { reason: String },

    #[error("No release asset matches platform marker {marker:?} (release {tag})")]
    NoMatchingAsset { marker: String, tag: String },

    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },
}

/// Archive unpacking errors
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Malformed archive: {reason}")]
    Decode { reason: String },

    #[error("Unsupported archive entry type {type_code:?} for {name}")]
    UnsupportedEntry { type_code: char, name: String },

    #[error("Archive entry escapes install directory: {name}")]
    PathTraversal { name: String },

    #[error("Archive contains no entry matching {marker:?}")]
    NoBinary { marker: String },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Child process lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("kcptun is already running (pid {pid:?})")]
    AlreadyRunning { pid: Option<u32> },

    #[error("Failed to launch {binary}: {reason}")]
    LaunchFailure { binary: String, reason: String },

    #[error("Failed to terminate process {pid}: {reason}")]
    TerminateFailure { pid: u32, reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, KcpvisorError>;
