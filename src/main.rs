//! kcpvisor - kcptun client supervisor
//!
//! Finds or downloads the kcptun client for this platform, runs it against
//! a tunnel config, and streams its output to the terminal.

use clap::{Parser, Subcommand};
use kcpvisor_core::{error::KcpvisorError, init_logging};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "kcpvisor")]
#[command(about = "Supervise a kcptun client: fetch, launch, stream logs, stop")]
struct Cli {
    /// Settings file (defaults to ~/.config/kcpvisor/kcpvisor.toml)
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the kcptun client until it exits or Ctrl+C is pressed
    Run,
    /// Download the latest client release into the install directory
    Fetch,
    /// Check the installed client binary
    Locate,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let Cli { settings, command } = cli;
    let settings = settings.as_deref();
    let result = runtime.block_on(async {
        match command {
            Commands::Run => cli::run::run_supervisor(settings).await,
            Commands::Fetch => cli::fetch::run_fetch(settings).await,
            Commands::Locate => cli::locate::run_locate(settings).await,
        }
    });

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let exit_code = match e {
                // Configuration errors (exit code 2)
                KcpvisorError::Config(_)
                | KcpvisorError::Toml(_)
                | KcpvisorError::TomlSerialize(_) => 2,
                // Acquisition and runtime errors (exit code 1)
                KcpvisorError::Locate(_)
                | KcpvisorError::Fetch(_)
                | KcpvisorError::Extract(_)
                | KcpvisorError::Process(_)
                | KcpvisorError::Io(_) => 1,
            };

            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}
