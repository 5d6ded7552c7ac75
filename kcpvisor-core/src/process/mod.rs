//! kcptun client process module
//!
//! Handles launching, output streaming and termination of the client.

pub mod kill;
pub mod state;
pub mod supervisor;

// Public re-exports
pub use kill::KillStrategy;
pub use state::{ProcessState, SharedProcessState, StartGuard};
pub use supervisor::{ExitReport, ProcessSupervisor, TerminateOutcome};
