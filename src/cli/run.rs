//! Run command implementation
//!
//! Start and stop each run on their own task, so Ctrl+C can reach
//! `terminate` while `start` is still waiting on the child.

use super::build_supervisor;
use colored::Colorize;
use kcpvisor_core::error::KcpvisorError;
use kcpvisor_core::process::{ExitReport, TerminateOutcome};
use std::path::Path;
use tracing::{info, warn};

/// Run the client until it exits or the user interrupts it
pub async fn run_supervisor(settings: Option<&Path>) -> Result<(), KcpvisorError> {
    let supervisor = build_supervisor(settings)?;
    let paths = supervisor.paths();
    println!("Working directory: {}", paths.working_dir.display());
    println!("Tunnel config:     {}", paths.config_file.display());

    let mut run = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.start().await })
    };

    loop {
        tokio::select! {
            joined = &mut run => {
                let report = joined.map_err(|e| KcpvisorError::Io(std::io::Error::other(e)))??;
                print_report(&report);
                return Ok(());
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Interrupt received, terminating kcptun client");
                let stop = {
                    let supervisor = supervisor.clone();
                    tokio::spawn(async move { supervisor.terminate().await })
                };
                let outcome = stop
                    .await
                    .map_err(|e| KcpvisorError::Io(std::io::Error::other(e)))??;
                match outcome {
                    // The start task observes the exit and finishes on its own
                    TerminateOutcome::Killed { .. } => continue,
                    TerminateOutcome::NotRunning => {
                        warn!("Interrupted while no client was running");
                        run.abort();
                        // Wait for the cancelled start to kill anything it spawned
                        let _ = (&mut run).await;
                        println!("{} Cancelled", "✗".red());
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn print_report(report: &ExitReport) {
    match report.code {
        Some(code) if report.success => {
            println!("{} kcptun exited (code {})", "✓".green(), code)
        }
        Some(code) => println!("{} kcptun exited (code {})", "✗".red(), code),
        None => println!("{} kcptun stopped (pid {})", "■".yellow(), report.pid),
    }
}
