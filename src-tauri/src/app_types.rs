use std::{
    env,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use tauri::{AppHandle, Manager};

use sayas_supervisor::BackendSupervisor;

use crate::{
    app_helpers, append_desktop_log, append_shutdown_log, append_startup_log, backend_config,
    backend_log_sink, exit_state, launch_plan, runtime_paths::{self, RuntimePaths},
    BACKEND_SHUTDOWN_GRACE, DESKTOP_ENV_ENV,
};

/// Shell state shared by commands, the startup task and exit handling.
pub(crate) struct AppLifecycle {
    pub(crate) supervisor: Arc<BackendSupervisor>,
    pub(crate) paths: RuntimePaths,
    pub(crate) dev_mode: bool,
    pub(crate) is_starting: AtomicBool,
    exit_state: Mutex<exit_state::ExitStateMachine>,
}

impl AppLifecycle {
    pub(crate) fn new(supervisor: Arc<BackendSupervisor>, paths: RuntimePaths, dev_mode: bool) -> Self {
        Self {
            supervisor,
            paths,
            dev_mode,
            is_starting: AtomicBool::new(false),
            exit_state: Mutex::new(exit_state::ExitStateMachine::default()),
        }
    }

    pub(crate) fn from_environment(app_handle: &AppHandle) -> Result<Self, String> {
        let dev_mode =
            launch_plan::is_dev_mode(backend_config::process_env(DESKTOP_ENV_ENV).as_deref());
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf));
        let resource_dir = app_handle.path().resource_dir().ok();

        let plan = launch_plan::resolve_launch_plan(
            dev_mode,
            launch_plan::workspace_root_dir(),
            exe_dir,
            resource_dir,
            backend_config::process_env,
        )?;
        append_startup_log(&format!(
            "launch plan: packaged={} cwd={} command={:?}",
            plan.packaged_mode,
            plan.app_root.display(),
            launch_plan::build_debug_command(&plan)
        ));

        let user_data =
            runtime_paths::resolve_user_data_dir(app_handle.path().app_data_dir().ok())
                .ok_or_else(|| "Unable to resolve a user data directory.".to_string())?;
        app_helpers::pin_desktop_log_root(&user_data);
        let paths = RuntimePaths::new(plan.app_root.clone(), user_data);
        paths.ensure_user_data_layout(append_startup_log)?;

        let config = backend_config::build_supervisor_config(&plan, backend_config::process_env);
        let supervisor = Arc::new(BackendSupervisor::new(config, backend_log_sink()));
        Ok(Self::new(supervisor, paths, dev_mode))
    }

    pub(crate) fn mark_quitting(&self) {
        match self.exit_state.lock() {
            Ok(mut guard) => guard.mark_quitting(),
            Err(error) => {
                append_desktop_log(&format!(
                    "exit state lock poisoned when marking quitting: {error}"
                ));
                error.into_inner().mark_quitting();
            }
        }
    }

    pub(crate) fn is_quitting(&self) -> bool {
        match self.exit_state.lock() {
            Ok(guard) => guard.is_quitting(),
            Err(error) => {
                append_desktop_log(&format!(
                    "exit state lock poisoned when reading quitting state: {error}"
                ));
                error.into_inner().is_quitting()
            }
        }
    }

    pub(crate) fn try_begin_exit_cleanup(&self) -> bool {
        match self.exit_state.lock() {
            Ok(mut guard) => guard.try_begin_cleanup(),
            Err(error) => {
                append_desktop_log(&format!(
                    "exit state lock poisoned when beginning cleanup: {error}"
                ));
                error.into_inner().try_begin_cleanup()
            }
        }
    }

    /// Terminate whatever backends are live. Safe to call repeatedly.
    pub(crate) fn stop_backends(&self, reason: &str) {
        self.log_live_backends(reason);
        self.supervisor.stop();
    }

    /// Like [`Self::stop_backends`], but blocks until the children exit or
    /// `BACKEND_SHUTDOWN_GRACE` passes. Must not run on an async worker.
    pub(crate) fn shutdown_backends(&self, reason: &str) {
        tauri::async_runtime::block_on(self.shutdown_backends_async(reason));
    }

    /// Stop the backends and wait for them, including ones stopped earlier.
    pub(crate) async fn shutdown_backends_async(&self, reason: &str) {
        self.log_live_backends(reason);
        let remaining = self.supervisor.shutdown(BACKEND_SHUTDOWN_GRACE).await;
        if !remaining.is_empty() {
            append_shutdown_log(&format!(
                "{reason}: backends {remaining:?} did not exit in time"
            ));
        }
    }

    fn log_live_backends(&self, reason: &str) {
        let live = self.supervisor.live_roles();
        if live.is_empty() {
            append_shutdown_log(&format!("{reason}: no backend processes running"));
        } else {
            append_shutdown_log(&format!("{reason}: stopping backends {live:?}"));
        }
    }
}

pub(crate) struct AtomicFlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> AtomicFlagGuard<'a> {
    pub(crate) fn try_set(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { flag })
    }
}

impl Drop for AtomicFlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
