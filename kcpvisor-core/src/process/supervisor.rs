//! kcptun client supervisor
//!
//! Manages the client process lifecycle from binary acquisition through
//! launch, output streaming and termination.

use crate::acquire::{BinaryLocator, BinarySource, ReleaseFetcher};
use crate::config::{ResolvedPaths, SupervisorConfig};
use crate::error::{ConfigError, KcpvisorError, ProcessError};
use crate::process::kill::KillStrategy;
use crate::process::state::{ProcessState, SharedProcessState, StartGuard, StopReply};
use crate::sink::SharedSink;
use crate::types::Platform;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Flag introducing the tunnel config file on the client command line
const CONFIG_FLAG: &str = "-c";

/// `CREATE_NO_WINDOW` process creation flag
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Summary of a finished child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub pid: u32,
    /// Exit code; `None` when killed by a signal or the wait failed
    pub code: Option<i32>,
    pub success: bool,
    /// Non-empty output lines delivered to the sink
    pub lines_forwarded: usize,
}

/// Result of a terminate request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// Nothing was running
    NotRunning,
    /// The child was killed
    Killed { pid: u32 },
}

/// Supervises a single kcptun client process
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    state: SharedProcessState,
    paths: ResolvedPaths,
    source: BinarySource,
    killer: KillStrategy,
    drain_grace: Duration,
    sink: SharedSink,
}

impl ProcessSupervisor {
    /// Create a supervisor from explicit parts
    pub fn new(
        paths: ResolvedPaths,
        source: BinarySource,
        killer: KillStrategy,
        drain_grace: Duration,
        sink: SharedSink,
    ) -> Self {
        Self {
            state: SharedProcessState::new(),
            paths,
            source,
            killer,
            drain_grace,
            sink,
        }
    }

    /// Create a supervisor for the host platform from configuration
    ///
    /// Fails with `Unsupported` on platforms kcptun publishes no release for.
    pub fn from_config(config: &SupervisorConfig, sink: SharedSink) -> Result<Self, KcpvisorError> {
        config
            .validate()
            .map_err(|message| ConfigError::ValidationError { message })?;
        let platform = Platform::current()?;
        let paths = config.resolve()?;

        let locator = BinaryLocator::new(
            paths.install_dir.clone(),
            platform,
            config.startup_timeout(),
        );
        let fetcher = ReleaseFetcher::new(
            config.release_url.clone(),
            paths.install_dir.clone(),
            platform,
            config.binary_marker.clone(),
            config.download_timeout(),
            sink.clone(),
        )?;
        let source = BinarySource::new(locator, fetcher, sink.clone());

        debug!(platform = %platform, "Supervisor configured: {:?}", paths);
        Ok(Self::new(
            paths,
            source,
            KillStrategy::detect(),
            config.startup_timeout(),
            sink,
        ))
    }

    /// Current lifecycle state
    pub fn state(&self) -> ProcessState {
        self.state.get()
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    pub fn source(&self) -> &BinarySource {
        &self.source
    }

    /// Obtain a binary and run it with the configured tunnel config
    ///
    /// Blocks the calling task until the child exits. Run it off any UI loop.
    pub async fn start(&self) -> Result<ExitReport, KcpvisorError> {
        let guard = self.begin_start()?;

        let binary = match self.source.obtain().await {
            Ok(binary) => binary,
            Err(e) => {
                error!("Failed to obtain kcptun client: {}", e);
                self.sink.append_line(&format!("[kcptun] {}", e));
                return Err(e);
            }
        };
        info!("[kcptun] binary path is {:?}", binary);

        let config_file = self.paths.config_file.clone();
        Ok(self.run_child(guard, &binary, config_file.as_os_str()).await?)
    }

    /// Run `binary -c config_file` and supervise it until exit
    ///
    /// Rejected with `AlreadyRunning` while another child is live or starting.
    pub async fn launch(
        &self,
        binary: &Path,
        config_file: impl AsRef<std::ffi::OsStr>,
    ) -> Result<ExitReport, ProcessError> {
        let guard = self.begin_start()?;
        self.run_child(guard, binary, config_file.as_ref()).await
    }

    /// Forcefully terminate the running child
    ///
    /// The kill is carried out by the task supervising the child. If the child
    /// exits before that task picks up the request, nothing is signalled.
    #[tracing::instrument(skip(self))]
    pub async fn terminate(&self) -> Result<TerminateOutcome, ProcessError> {
        let (pid, stop) = match self.state.stop_handle() {
            Some(handle) => handle,
            None => return Ok(self.not_running()),
        };

        let (reply, outcome) = oneshot::channel();
        if stop.send(reply).is_err() {
            return Ok(self.not_running());
        }

        match outcome.await {
            Ok(Ok(())) => {
                info!(pid, "kcptun client killed");
                self.sink.append_line("[kcptun] killed");
                Ok(TerminateOutcome::Killed { pid })
            }
            Ok(Err(e)) => {
                error!(pid, "Failed to kill kcptun client: {}", e);
                self.sink.append_line(&format!("[kcptun] kill failed: {}", e));
                Err(e)
            }
            Err(_) => {
                info!(pid, "kcptun client exited before the kill request");
                self.sink.append_line("[kcptun] not running");
                Ok(TerminateOutcome::NotRunning)
            }
        }
    }

    fn not_running(&self) -> TerminateOutcome {
        if self.state.get() == ProcessState::Starting {
            info!("Terminate requested while starting, nothing to kill yet");
            self.sink.append_line("[kcptun] not running (still starting)");
        } else {
            info!("Terminate requested but kcptun is not running");
            self.sink.append_line("[kcptun] not running");
        }
        TerminateOutcome::NotRunning
    }

    fn begin_start(&self) -> Result<StartGuard, ProcessError> {
        self.state.begin_start().map_err(|current| {
            warn!(state = %current, "Start requested while kcptun is busy");
            if let Some(pid) = current.pid() {
                self.sink
                    .append_line(&format!("[kcptun] current pid is {}", pid));
            }
            self.sink.append_line("[kcptun] already running.");
            ProcessError::AlreadyRunning { pid: current.pid() }
        })
    }

    async fn run_child(
        &self,
        guard: StartGuard,
        binary: &Path,
        config_file: &std::ffi::OsStr,
    ) -> Result<ExitReport, ProcessError> {
        let mut command = Command::new(binary);
        command
            .arg(CONFIG_FLAG)
            .arg(config_file)
            .current_dir(&self.paths.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        detach(&mut command);

        let child = command.spawn().map_err(|e| {
            let err = ProcessError::LaunchFailure {
                binary: binary.display().to_string(),
                reason: e.to_string(),
            };
            error!("{}", err);
            self.sink.append_line(&format!("[kcptun] {}", err));
            err
        })?;

        let pid = child.id().unwrap_or_default();
        let (stop_tx, mut stop_rx) = mpsc::unbounded_channel::<StopReply>();
        // Visible to terminate before any output is read
        guard.publish(pid, binary.to_path_buf(), stop_tx);
        let mut live = LiveChild {
            child,
            pid,
            killer: self.killer,
            armed: true,
            _start: guard,
        };
        info!(pid, "kcptun client started: {:?}", binary);
        self.sink
            .append_line(&format!("[kcptun] started, pid {}", pid));

        let forwarded = Arc::new(AtomicUsize::new(0));
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = live.child.stdout.take() {
            drains.push(self.spawn_drain(stdout, "stdout", &forwarded));
        }
        if let Some(stderr) = live.child.stderr.take() {
            drains.push(self.spawn_drain(stderr, "stderr", &forwarded));
        }

        let status = loop {
            tokio::select! {
                status = live.child.wait() => break status,
                Some(reply) = stop_rx.recv() => {
                    let result = self.killer.kill(pid).await;
                    if result.is_ok() {
                        self.state.clear_pid(pid);
                    }
                    let _ = reply.send(result);
                }
            }
        };
        // Reaped: pending stop requests must not reach the pid again
        live.armed = false;
        drop(stop_rx);

        self.join_drains(drains).await;
        drop(live);

        Ok(self.report_exit(pid, status, forwarded.load(Ordering::SeqCst)))
    }

    fn spawn_drain<R>(
        &self,
        stream: R,
        name: &'static str,
        forwarded: &Arc<AtomicUsize>,
    ) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(drain_lines(
            stream,
            name,
            self.sink.clone(),
            Arc::clone(forwarded),
        ))
    }

    /// Wait for output forwarding to finish, bounded by the grace period
    async fn join_drains(&self, drains: Vec<JoinHandle<()>>) {
        let deadline = tokio::time::Instant::now() + self.drain_grace;
        for drain in drains {
            match tokio::time::timeout_at(deadline, drain).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Output drain task failed: {}", e),
                Err(_) => warn!("Output drain still running after {:?}, abandoning", self.drain_grace),
            }
        }
    }

    fn report_exit(
        &self,
        pid: u32,
        status: std::io::Result<ExitStatus>,
        lines_forwarded: usize,
    ) -> ExitReport {
        match status {
            Ok(status) if status.success() => {
                info!(pid, "kcptun client exited");
                self.sink.append_line("[kcptun] exited");
                ExitReport {
                    pid,
                    code: status.code(),
                    success: true,
                    lines_forwarded,
                }
            }
            Ok(status) => {
                warn!(pid, "kcptun client exited with {}", status);
                self.sink
                    .append_line(&format!("[kcptun] exited with {}", status));
                ExitReport {
                    pid,
                    code: status.code(),
                    success: false,
                    lines_forwarded,
                }
            }
            Err(e) => {
                error!(pid, "Failed to wait for kcptun client: {}", e);
                self.sink.append_line(&format!("[kcptun] wait failed: {}", e));
                ExitReport {
                    pid,
                    code: None,
                    success: false,
                    lines_forwarded,
                }
            }
        }
    }
}

/// A spawned child together with the start attempt that owns it
///
/// Dropped while armed (the supervising future was cancelled before the child
/// was reaped), it kills the whole tree so no unsupervised client survives.
/// The start slot is released afterwards.
struct LiveChild {
    child: Child,
    pid: u32,
    killer: KillStrategy,
    armed: bool,
    _start: StartGuard,
}

impl Drop for LiveChild {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(pid = self.pid, "Supervision cancelled, killing kcptun client");
        if let Err(e) = self.killer.kill_now(self.pid) {
            error!(pid = self.pid, "Failed to kill abandoned kcptun client: {}", e);
        }
    }
}

/// Forward non-empty lines of one output stream until EOF
async fn drain_lines<R>(stream: R, name: &'static str, sink: SharedSink, forwarded: Arc<AtomicUsize>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(|c: char| c == '\n' || c == '\r');
                if line.is_empty() {
                    continue;
                }
                info!(target: "kcptun", stream = name, "{}", line);
                sink.append_line(line);
                forwarded.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                warn!(stream = name, "Failed to read kcptun output: {}", e);
                break;
            }
        }
    }
    debug!(stream = name, "Output stream closed");
}

/// Start the child without a console window and outside our process group
fn detach(command: &mut Command) {
    #[cfg(unix)]
    command.process_group(0);

    #[cfg(windows)]
    command.creation_flags(CREATE_NO_WINDOW);

    #[cfg(not(any(unix, windows)))]
    let _ = command;
}
