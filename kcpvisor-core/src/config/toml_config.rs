//! TOML configuration file I/O
//!
//! Handles loading and saving supervisor settings to/from TOML files in the
//! user's configuration directory.

use crate::config::SupervisorConfig;
use crate::error::{ConfigError, KcpvisorError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "kcpvisor.toml";

/// Get the default configuration directory
///
/// Returns ~/.config/kcpvisor, or KCPVISOR_CONFIG_DIR if set
pub fn get_config_dir() -> Result<PathBuf, KcpvisorError> {
    // Allow tests to override config directory via environment variable
    if let Ok(config_dir) = std::env::var("KCPVISOR_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| {
            KcpvisorError::Config(ConfigError::IoError {
                message: "HOME environment variable not set".to_string(),
            })
        })?;

    Ok(PathBuf::from(home).join(".config").join("kcpvisor"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, KcpvisorError> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from the default location
///
/// A missing file yields the defaults; a present but broken file is an error.
pub fn load_config() -> Result<SupervisorConfig, KcpvisorError> {
    let config_path = get_config_path()?;
    if !config_path.exists() {
        debug!("No configuration at {:?}, using defaults", config_path);
        return Ok(SupervisorConfig::default());
    }
    load_config_from_path(&config_path)
}

/// Load configuration from a specific TOML file
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<SupervisorConfig, KcpvisorError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => KcpvisorError::Config(ConfigError::LoadFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        }),
        _ => KcpvisorError::Config(ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        }),
    })?;

    let config: SupervisorConfig = toml::from_str(&contents).map_err(|e| {
        KcpvisorError::Config(ConfigError::ValidationError {
            message: format!("Failed to parse config file: {}", e),
        })
    })?;

    config
        .validate()
        .map_err(|e| KcpvisorError::Config(ConfigError::ValidationError { message: e }))?;

    info!(
        "Loaded configuration: install_dir={:?}, config_file={:?}, release_url={}",
        config.install_dir, config.config_file, config.release_url
    );

    Ok(config)
}

/// Save configuration to a specific TOML file
pub fn save_config_to_path<P: AsRef<Path>>(
    config: &SupervisorConfig,
    path: P,
) -> Result<(), KcpvisorError> {
    config
        .validate()
        .map_err(|e| KcpvisorError::Config(ConfigError::ValidationError { message: e }))?;

    // Ensure config directory exists
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            KcpvisorError::Config(ConfigError::IoError {
                message: format!("Failed to create config directory: {}", e),
            })
        })?;
    }

    let contents = toml::to_string_pretty(config)?;

    std::fs::write(&path, contents).map_err(|_e| {
        KcpvisorError::Config(ConfigError::SaveFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        })
    })?;

    info!("Saved configuration to {:?}", path.as_ref());
    Ok(())
}
