//! Locate command implementation

use super::build_supervisor;
use colored::Colorize;
use kcpvisor_core::error::KcpvisorError;
use std::path::Path;

/// Report the installed client binary and its version
pub async fn run_locate(settings: Option<&Path>) -> Result<(), KcpvisorError> {
    let supervisor = build_supervisor(settings)?;
    let locator = supervisor.source().locator();
    println!("Looking for {}", locator.expected_path().display());

    let found = locator.locate().await?;
    println!("{} {}", "✓".green(), found.path.display());
    println!("  {}", found.version);
    Ok(())
}
