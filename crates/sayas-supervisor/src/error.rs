//! Error types for backend startup

use std::path::PathBuf;
use thiserror::Error;

use crate::types::BackendRole;

/// Failures of a startup attempt or of spawning a single backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    /// Interpreter or script is absent; nothing was spawned
    #[error("Missing {role} backend dependency: {}", path.display())]
    MissingDependency { role: BackendRole, path: PathBuf },

    /// The OS refused to create the process
    #[error("Failed to start {role} backend: {message}")]
    Spawn { role: BackendRole, message: String },

    /// The process exited before the readiness line was seen
    #[error("{role} backend exited before becoming ready ({})", describe_exit(*code, signal.as_deref()))]
    PrematureExit {
        role: BackendRole,
        code: Option<i32>,
        signal: Option<String>,
    },

    #[error("{role} backend failed to start within {} seconds", after_ms / 1000)]
    StartupTimeout { role: BackendRole, after_ms: u64 },

    #[error("Backend startup is already in progress")]
    AlreadyStarting,

    #[error("Backends are still running; stop them before starting again")]
    AlreadyRunning,

    #[error("Backend startup was cancelled")]
    Cancelled,
}

impl SupervisorError {
    pub fn role(&self) -> Option<BackendRole> {
        match self {
            SupervisorError::MissingDependency { role, .. }
            | SupervisorError::Spawn { role, .. }
            | SupervisorError::PrematureExit { role, .. }
            | SupervisorError::StartupTimeout { role, .. } => Some(*role),
            SupervisorError::AlreadyStarting
            | SupervisorError::AlreadyRunning
            | SupervisorError::Cancelled => None,
        }
    }
}

pub fn describe_exit(code: Option<i32>, signal: Option<&str>) -> String {
    match (code, signal) {
        (Some(code), _) => format!("exit code {code}"),
        (None, Some(signal)) => format!("signal {signal}"),
        (None, None) => "unknown exit status".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
