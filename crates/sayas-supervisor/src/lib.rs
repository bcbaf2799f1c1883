//! Supervision of the SayAs backend processes.
//!
//! [`BackendSupervisor`] starts the optional API server and the mandatory UI
//! server, waits for the UI to print its local endpoint, and tears both down
//! on [`BackendSupervisor::stop`]. Each process is wrapped in a
//! [`ChildProcessHandle`] that exposes its output and exit as a stream of
//! [`ChildEvent`]s.

pub mod child;
pub mod config;
pub mod error;
pub mod readiness;
pub mod supervisor;
pub mod types;

pub use child::ChildProcessHandle;
pub use config::{
    ChildSpec, SupervisorConfig, DEFAULT_OUTPUT_DRAIN_TIMEOUT, DEFAULT_STARTUP_TIMEOUT,
    DEFAULT_UI_PORT,
};
pub use error::{describe_exit, Result, SupervisorError};
pub use readiness::{local_endpoint, ReadinessProbe};
pub use supervisor::BackendSupervisor;
pub use types::{
    BackendRole, ChildEvent, ChildState, LogSink, OutputStream, SupervisorEvent, SupervisorPhase,
};
