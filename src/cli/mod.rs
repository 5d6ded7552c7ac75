//! CLI command implementations
//!
//! This module contains the implementation of all CLI subcommands.

pub mod console;
pub mod fetch;
pub mod locate;
pub mod run;

use console::ConsoleSink;
use kcpvisor_core::config::toml_config::{load_config, load_config_from_path};
use kcpvisor_core::error::KcpvisorError;
use kcpvisor_core::process::ProcessSupervisor;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Load settings and build a supervisor printing to the terminal
pub fn build_supervisor(settings: Option<&Path>) -> Result<ProcessSupervisor, KcpvisorError> {
    let config = match settings {
        Some(path) => load_config_from_path(path)?,
        None => load_config()?,
    };
    debug!("Loaded settings: {:?}", config);

    ProcessSupervisor::from_config(&config, Arc::new(ConsoleSink::new()))
}
