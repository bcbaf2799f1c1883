use tauri::{AppHandle, Manager};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

use sayas_supervisor::SupervisorError;

use crate::{main_window, AppLifecycle, AtomicFlagGuard};

const STARTUP_ERROR_TITLE: &str = "Startup Error";

pub(crate) fn startup_error_message(error: &str) -> String {
    format!(
        "Failed to start SayAs TTS:\n\n{error}\n\n\
         Please check that Python and the SayAs backend are installed correctly."
    )
}

/// Start the backends, then open the main window on the UI URL.
///
/// Repeated calls while a startup is in flight are ignored.
pub(crate) fn spawn_startup_task<F>(app_handle: AppHandle, log: F)
where
    F: Fn(&str) + Send + Copy + 'static,
{
    tauri::async_runtime::spawn(async move {
        let lifecycle = app_handle.state::<AppLifecycle>();
        let Some(_startup_guard) = AtomicFlagGuard::try_set(&lifecycle.is_starting) else {
            log("startup already in progress; skipping");
            return;
        };

        let supervisor = lifecycle.supervisor.clone();
        log(&format!("starting backends for {}", supervisor.ui_url()));
        match supervisor.start().await {
            Ok(()) | Err(SupervisorError::AlreadyRunning) => {
                if lifecycle.is_quitting() {
                    log("backends ready after quit was requested; not opening a window");
                    return;
                }
                let ui_url = supervisor.ui_url();
                if let Err(error) = main_window::open_main_window(&app_handle, &ui_url, log) {
                    show_startup_error(&app_handle, &error, log).await;
                }
            }
            Err(SupervisorError::Cancelled) => {
                log("backend startup cancelled");
            }
            Err(error) => show_startup_error(&app_handle, &error.to_string(), log).await,
        }
    });
}

/// Report a failure that happened before the supervisor existed.
pub(crate) fn spawn_startup_failure<F>(app_handle: AppHandle, error: String, log: F)
where
    F: Fn(&str) + Send + Copy + 'static,
{
    tauri::async_runtime::spawn(async move {
        show_startup_error(&app_handle, &error, log).await;
    });
}

/// Blocking error dialog, then wait for the backends to exit, then exit code 1.
async fn show_startup_error<F>(app_handle: &AppHandle, error: &str, log: F)
where
    F: Fn(&str) + Send,
{
    log(&format!("startup failed: {error}"));
    let lifecycle = app_handle.try_state::<AppLifecycle>();
    if let Some(lifecycle) = &lifecycle {
        lifecycle.mark_quitting();
    }

    app_handle
        .dialog()
        .message(startup_error_message(error))
        .title(STARTUP_ERROR_TITLE)
        .kind(MessageDialogKind::Error)
        .blocking_show();

    if let Some(lifecycle) = &lifecycle {
        lifecycle.shutdown_backends_async("startup failure").await;
    }
    app_handle.exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sayas_supervisor::BackendRole;

    #[test]
    fn startup_error_message_carries_failure_reason() {
        let error = SupervisorError::StartupTimeout {
            role: BackendRole::Ui,
            after_ms: 60_000,
        };
        let message = startup_error_message(&error.to_string());
        assert!(message.starts_with("Failed to start SayAs TTS:"));
        assert!(message.contains(&error.to_string()));
        assert!(message.contains("Python"));
    }
}
