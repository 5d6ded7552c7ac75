//! Fetch command implementation

use super::build_supervisor;
use colored::Colorize;
use kcpvisor_core::error::KcpvisorError;
use std::path::Path;

/// Download the latest release regardless of what is installed
pub async fn run_fetch(settings: Option<&Path>) -> Result<(), KcpvisorError> {
    let supervisor = build_supervisor(settings)?;
    let binary = supervisor.source().fetcher().acquire().await?;

    println!("{} Installed {}", "✓".green(), binary.display());
    Ok(())
}
