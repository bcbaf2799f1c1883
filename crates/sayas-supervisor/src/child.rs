//! One supervised backend process and its event stream

use std::{
    process::{ExitStatus, Stdio},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    config::ChildSpec,
    error::{describe_exit, Result, SupervisorError},
    types::{BackendRole, ChildEvent, ChildState, LogSink, OutputStream},
};

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug)]
struct ChildStatus {
    state: ChildState,
    exit_code: Option<i32>,
    exit_signal: Option<String>,
    termination_requested: bool,
}

impl Default for ChildStatus {
    fn default() -> Self {
        Self {
            state: ChildState::NotStarted,
            exit_code: None,
            exit_signal: None,
            termination_requested: false,
        }
    }
}

/// Handle to a spawned backend process.
///
/// The OS process itself is owned by a background task that forwards its
/// output and reports its exit; the handle only observes state and can ask
/// for termination.
pub struct ChildProcessHandle {
    spec: ChildSpec,
    pid: Option<u32>,
    status: Arc<Mutex<ChildStatus>>,
    terminate_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl ChildProcessHandle {
    /// Spawn `spec.executable spec.script` with piped stdout/stderr.
    ///
    /// Must be called from within a tokio runtime. The returned receiver
    /// yields every output line before the final `Exited` event.
    pub fn spawn(
        spec: &ChildSpec,
        drain_timeout: Duration,
        log: LogSink,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChildEvent>)> {
        let role = spec.role;
        for path in [&spec.executable, &spec.script] {
            if !path.is_file() {
                return Err(SupervisorError::Spawn {
                    role,
                    message: format!("{} does not exist", path.display()),
                });
            }
        }

        let status = Arc::new(Mutex::new(ChildStatus {
            state: ChildState::Starting,
            ..ChildStatus::default()
        }));

        let mut command = Command::new(&spec.executable);
        command
            .arg(&spec.script)
            .current_dir(&spec.working_dir)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(target_os = "windows")]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = command.spawn().map_err(|error| {
            lock_status(&status).state = ChildState::FailedToStart;
            SupervisorError::Spawn {
                role,
                message: format!(
                    "failed to spawn {:?}: {}",
                    spec.debug_command(),
                    error
                ),
            }
        })?;
        let pid = child.id();
        log(&format!(
            "[{role}] spawned pid={} command={:?} cwd={}",
            pid.map(|pid| pid.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            spec.debug_command(),
            spec.working_dir.display()
        ));
        lock_status(&status).state = ChildState::Running;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(
                role,
                OutputStream::Stdout,
                stdout,
                event_tx.clone(),
                log.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(
                role,
                OutputStream::Stderr,
                stderr,
                event_tx.clone(),
                log.clone(),
            )));
        }

        let (terminate_tx, terminate_rx) = oneshot::channel();
        tokio::spawn(supervise_exit(ExitWatch {
            role,
            pid,
            child,
            readers,
            terminate_rx,
            status: status.clone(),
            events: event_tx,
            log,
            drain_timeout,
        }));

        Ok((
            Self {
                spec: spec.clone(),
                pid,
                status,
                terminate_tx: Mutex::new(Some(terminate_tx)),
            },
            event_rx,
        ))
    }

    pub fn role(&self) -> BackendRole {
        self.spec.role
    }

    pub fn spec(&self) -> &ChildSpec {
        &self.spec
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn state(&self) -> ChildState {
        lock_status(&self.status).state
    }

    pub fn is_live(&self) -> bool {
        self.state().is_live()
    }

    pub fn exit_code(&self) -> Option<i32> {
        lock_status(&self.status).exit_code
    }

    pub fn exit_signal(&self) -> Option<String> {
        lock_status(&self.status).exit_signal.clone()
    }

    /// Ask the process to exit gracefully. No-op once it has exited.
    pub fn terminate(&self) {
        {
            let mut status = lock_status(&self.status);
            if !status.state.is_live() || status.termination_requested {
                return;
            }
            status.termination_requested = true;
        }

        let sender = match self.terminate_tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(error) => error.into_inner().take(),
        };
        if let Some(sender) = sender {
            // The exit task may have finished in between; nothing left to signal then.
            let _ = sender.send(());
        }
    }
}

impl std::fmt::Debug for ChildProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcessHandle")
            .field("role", &self.spec.role)
            .field("pid", &self.pid)
            .field("state", &self.state())
            .finish()
    }
}

fn lock_status(status: &Mutex<ChildStatus>) -> MutexGuard<'_, ChildStatus> {
    match status.lock() {
        Ok(guard) => guard,
        Err(error) => error.into_inner(),
    }
}

pub(crate) fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

async fn forward_lines<R>(
    role: BackendRole,
    stream: OutputStream,
    reader: R,
    events: mpsc::UnboundedSender<ChildEvent>,
    log: LogSink,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = decode_line(&buf);
                log(&format!("[{role}:{}] {text}", stream.as_str()));
                // Keep reading after the receiver is gone so the pipe never fills up.
                let _ = events.send(ChildEvent::OutputLine { stream, text });
            }
            Err(error) => {
                log(&format!(
                    "[{role}] failed to read {}: {error}",
                    stream.as_str()
                ));
                break;
            }
        }
    }
}

struct ExitWatch {
    role: BackendRole,
    pid: Option<u32>,
    child: Child,
    readers: Vec<JoinHandle<()>>,
    terminate_rx: oneshot::Receiver<()>,
    status: Arc<Mutex<ChildStatus>>,
    events: mpsc::UnboundedSender<ChildEvent>,
    log: LogSink,
    drain_timeout: Duration,
}

async fn supervise_exit(watch: ExitWatch) {
    let ExitWatch {
        role,
        pid,
        mut child,
        mut readers,
        mut terminate_rx,
        status,
        events,
        log,
        drain_timeout,
    } = watch;

    let mut terminate_pending = true;
    let exit = loop {
        tokio::select! {
            exit = child.wait() => break exit,
            request = &mut terminate_rx, if terminate_pending => {
                terminate_pending = false;
                if request.is_ok() {
                    request_termination(role, pid, &mut child, &log).await;
                }
            }
        }
    };

    // Exit is reported only after the output that preceded it.
    let drain = async {
        for reader in readers.iter_mut() {
            let _ = reader.await;
        }
    };
    if tokio::time::timeout(drain_timeout, drain).await.is_err() {
        log(&format!(
            "[{role}] output still open {}ms after exit; dropping the rest",
            drain_timeout.as_millis()
        ));
        for reader in &readers {
            reader.abort();
        }
    }

    match exit {
        Ok(exit_status) => {
            let code = exit_status.code();
            let signal = exit_signal_name(&exit_status);
            let requested = {
                let mut status = lock_status(&status);
                status.state = ChildState::Exited;
                status.exit_code = code;
                status.exit_signal = signal.clone();
                status.termination_requested
            };
            log(&format!(
                "[{role}] process exited ({}){}",
                describe_exit(code, signal.as_deref()),
                if requested { " after termination request" } else { "" }
            ));
            let _ = events.send(ChildEvent::Exited {
                code,
                signal,
                requested,
            });
        }
        Err(error) => {
            lock_status(&status).state = ChildState::FailedToStart;
            let reason = format!("failed to observe process status: {error}");
            log(&format!("[{role}] {reason}"));
            let _ = events.send(ChildEvent::SpawnFailed { reason });
        }
    }
}

#[cfg(unix)]
async fn request_termination(role: BackendRole, pid: Option<u32>, child: &mut Child, log: &LogSink) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => log(&format!("[{role}] sent SIGTERM to pid={pid}")),
        Err(error) => {
            log(&format!(
                "[{role}] failed to send SIGTERM to pid={pid}: {error}; killing"
            ));
            let _ = child.start_kill();
        }
    }
}

#[cfg(target_os = "windows")]
async fn request_termination(role: BackendRole, pid: Option<u32>, child: &mut Child, log: &LogSink) {
    let Some(pid) = pid else {
        return;
    };
    let result = Command::new("taskkill")
        .args(["/pid", &pid.to_string(), "/t", "/f"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .creation_flags(CREATE_NO_WINDOW)
        .status()
        .await;
    match result {
        Ok(exit) if exit.success() => log(&format!("[{role}] taskkill stopped pid={pid}")),
        Ok(exit) => {
            log(&format!(
                "[{role}] taskkill for pid={pid} returned {exit}; killing"
            ));
            let _ = child.start_kill();
        }
        Err(error) => {
            log(&format!(
                "[{role}] failed to run taskkill for pid={pid}: {error}; killing"
            ));
            let _ = child.start_kill();
        }
    }
}

#[cfg(not(any(unix, target_os = "windows")))]
async fn request_termination(role: BackendRole, _pid: Option<u32>, child: &mut Child, log: &LogSink) {
    log(&format!("[{role}] killing process"));
    let _ = child.start_kill();
}

#[cfg(unix)]
fn exit_signal_name(status: &ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;

    let raw = status.signal()?;
    Some(
        nix::sys::signal::Signal::try_from(raw)
            .map(|signal| signal.as_str().to_string())
            .unwrap_or_else(|_| format!("signal {raw}")),
    )
}

#[cfg(not(unix))]
fn exit_signal_name(_status: &ExitStatus) -> Option<String> {
    None
}
