//! Launch configuration for the supervised backends

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::BackendRole;

pub const DEFAULT_UI_PORT: u16 = 7860;
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything needed to spawn one backend process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpec {
    pub role: BackendRole,
    pub executable: PathBuf,
    pub script: PathBuf,
    pub working_dir: PathBuf,
    /// Added on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

impl ChildSpec {
    pub fn debug_command(&self) -> Vec<String> {
        vec![
            self.executable.to_string_lossy().to_string(),
            self.script.to_string_lossy().to_string(),
        ]
    }
}

/// Configuration for [`crate::BackendSupervisor`].
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub executable: PathBuf,
    pub ui_script: PathBuf,
    /// Optional unless `require_api` is set
    pub api_script: Option<PathBuf>,
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub ui_port: u16,
    pub startup_timeout: Duration,
    /// Treat API absence, spawn failure or early exit as a startup failure
    pub require_api: bool,
    /// Upper bound for draining output after a process exits
    pub output_drain_timeout: Duration,
}

impl SupervisorConfig {
    pub fn new(
        executable: impl Into<PathBuf>,
        ui_script: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executable: executable.into(),
            ui_script: ui_script.into(),
            api_script: None,
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
            ui_port: DEFAULT_UI_PORT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            require_api: false,
            output_drain_timeout: DEFAULT_OUTPUT_DRAIN_TIMEOUT,
        }
    }

    pub fn api_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.api_script = Some(script.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    pub fn ui_port(mut self, port: u16) -> Self {
        self.ui_port = port;
        self
    }

    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn require_api(mut self, required: bool) -> Self {
        self.require_api = required;
        self
    }

    pub fn output_drain_timeout(mut self, timeout: Duration) -> Self {
        self.output_drain_timeout = timeout;
        self
    }

    /// URL the window should load once the UI backend is ready.
    pub fn ui_url(&self) -> String {
        format!("{}/", crate::readiness::local_endpoint(self.ui_port))
    }

    pub fn child_spec(&self, role: BackendRole) -> Option<ChildSpec> {
        let script = match role {
            BackendRole::Ui => self.ui_script.clone(),
            BackendRole::Api => self.api_script.clone()?,
        };
        Some(ChildSpec {
            role,
            executable: self.executable.clone(),
            script,
            working_dir: self.working_dir.clone(),
            env: self.env.clone(),
        })
    }

    /// Roles to spawn, API first. Fails on the first required path that is missing.
    ///
    /// A missing interpreter is reported against the first role that would run it.
    pub(crate) fn validate(&self) -> crate::Result<Vec<ChildSpec>> {
        ensure_file(BackendRole::Ui, &self.ui_script)?;

        let mut specs = Vec::with_capacity(2);
        match self.api_script.as_deref() {
            Some(api_script) if api_script.is_file() => {
                specs.extend(self.child_spec(BackendRole::Api));
            }
            Some(api_script) if self.require_api => {
                return Err(crate::SupervisorError::MissingDependency {
                    role: BackendRole::Api,
                    path: api_script.to_path_buf(),
                });
            }
            None if self.require_api => {
                return Err(crate::SupervisorError::MissingDependency {
                    role: BackendRole::Api,
                    path: PathBuf::new(),
                });
            }
            _ => {}
        }
        specs.extend(self.child_spec(BackendRole::Ui));

        let first_role = specs.first().map_or(BackendRole::Ui, |spec| spec.role);
        ensure_file(first_role, &self.executable)?;
        Ok(specs)
    }
}

fn ensure_file(role: BackendRole, path: &Path) -> crate::Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(crate::SupervisorError::MissingDependency {
            role,
            path: path.to_path_buf(),
        })
    }
}
