use std::{fmt, sync::Arc};

/// Log callback shared between the supervisor and its reader tasks.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendRole {
    Api,
    Ui,
}

impl BackendRole {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendRole::Api => "api",
            BackendRole::Ui => "ui",
        }
    }
}

impl fmt::Display for BackendRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    NotStarted,
    Starting,
    Running,
    Exited,
    FailedToStart,
}

impl ChildState {
    pub fn is_live(self) -> bool {
        matches!(self, ChildState::Starting | ChildState::Running)
    }
}

/// Events emitted by a child process handle, in the order they were observed.
///
/// For a given handle every `OutputLine` is delivered before `Exited`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildEvent {
    OutputLine {
        stream: OutputStream,
        text: String,
    },
    Exited {
        code: Option<i32>,
        signal: Option<String>,
        requested: bool,
    },
    SpawnFailed {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorPhase {
    Idle,
    StartingApi,
    StartingUi,
    AwaitingReadiness,
    Ready,
    Failed,
}

impl SupervisorPhase {
    pub fn is_starting(self) -> bool {
        matches!(
            self,
            SupervisorPhase::StartingApi
                | SupervisorPhase::StartingUi
                | SupervisorPhase::AwaitingReadiness
        )
    }
}

/// Notifications published to subscribers of the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    BackendError {
        role: BackendRole,
        text: String,
    },
    BackendExited {
        role: BackendRole,
        code: Option<i32>,
        signal: Option<String>,
    },
}
