//! Child process state management
//!
//! Defines the Idle → Starting → Running lifecycle and provides thread-safe
//! state tracking shared between the start task and any stop request.

use crate::error::ProcessError;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};

/// Reply half of a stop request
pub type StopReply = oneshot::Sender<Result<(), ProcessError>>;

/// Reaches the task that owns the live child
///
/// Only that task kills the child, so a pid is never signalled after it has
/// been reaped.
pub type StopSender = mpsc::UnboundedSender<StopReply>;

/// Lifecycle of the supervised kcptun client
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessState {
    /// No child and no start in progress
    #[default]
    Idle,

    /// Acquiring the binary or creating the process
    Starting,

    /// Child created; pid is the handle used for termination
    Running { pid: u32, binary: PathBuf },
}

impl ProcessState {
    /// Pid of the live child, if any
    pub fn pid(&self) -> Option<u32> {
        match self {
            ProcessState::Running { pid, .. } => Some(*pid),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Idle => write!(f, "idle"),
            ProcessState::Starting => write!(f, "starting"),
            ProcessState::Running { pid, .. } => write!(f, "running (pid {})", pid),
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    state: ProcessState,
    generation: u64,
    stop: Option<StopSender>,
}

/// Thread-safe process state wrapper
///
/// The lock is never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedProcessState(Arc<Mutex<Slot>>);

impl SharedProcessState {
    /// Create a new shared process state
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get the current process state
    pub fn get(&self) -> ProcessState {
        self.lock().state.clone()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.get(), ProcessState::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.get(), ProcessState::Running { .. })
    }

    /// Pid of the live child, if any
    pub fn running_pid(&self) -> Option<u32> {
        self.get().pid()
    }

    /// Pid of the live child and the channel to ask its owner to kill it
    pub fn stop_handle(&self) -> Option<(u32, StopSender)> {
        let slot = self.lock();
        match (&slot.state, &slot.stop) {
            (ProcessState::Running { pid, .. }, Some(stop)) => Some((*pid, stop.clone())),
            _ => None,
        }
    }

    /// Transition Idle → Starting
    ///
    /// On success the returned guard owns this start attempt: it publishes the
    /// pid and resets the state to Idle when dropped. When a start is already
    /// in progress or a child is live, the current state is returned instead.
    pub fn begin_start(&self) -> Result<StartGuard, ProcessState> {
        let mut slot = self.lock();
        if slot.state != ProcessState::Idle {
            return Err(slot.state.clone());
        }
        slot.generation += 1;
        slot.state = ProcessState::Starting;
        Ok(StartGuard {
            state: self.clone(),
            generation: slot.generation,
        })
    }

    /// Transition Running → Idle after a successful kill
    ///
    /// Only clears the slot if it still refers to `pid`.
    pub fn clear_pid(&self, pid: u32) -> bool {
        let mut slot = self.lock();
        if slot.state.pid() == Some(pid) {
            slot.state = ProcessState::Idle;
            slot.stop = None;
            true
        } else {
            false
        }
    }

    fn publish(&self, generation: u64, pid: u32, binary: PathBuf, stop: StopSender) -> bool {
        let mut slot = self.lock();
        if slot.generation == generation && slot.state == ProcessState::Starting {
            slot.state = ProcessState::Running { pid, binary };
            slot.stop = Some(stop);
            true
        } else {
            false
        }
    }

    fn release(&self, generation: u64) {
        let mut slot = self.lock();
        if slot.generation == generation {
            slot.state = ProcessState::Idle;
            slot.stop = None;
        }
    }
}

/// Ownership of one start attempt
///
/// Dropping the guard returns the state to Idle unless a newer start attempt
/// has taken over the slot.
#[derive(Debug)]
pub struct StartGuard {
    state: SharedProcessState,
    generation: u64,
}

impl StartGuard {
    /// Transition Starting → Running
    pub fn publish(&self, pid: u32, binary: PathBuf, stop: StopSender) -> bool {
        self.state.publish(self.generation, pid, binary, stop)
    }
}

impl Drop for StartGuard {
    fn drop(&mut self) {
        self.state.release(self.generation);
    }
}
