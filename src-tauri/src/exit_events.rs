use tauri::{AppHandle, ExitRequestApi, Manager};

use crate::{
    append_shutdown_log,
    exit_state::{self, ExitRequestDecision},
    AppLifecycle,
};

pub(crate) fn handle_exit_requested(app_handle: &AppHandle, api: &ExitRequestApi, code: Option<i32>) {
    let Some(lifecycle) = app_handle.try_state::<AppLifecycle>() else {
        return;
    };

    match exit_state::decide_exit_request(
        code,
        lifecycle.is_quitting(),
        exit_state::platform_keeps_alive_without_windows(),
    ) {
        ExitRequestDecision::KeepAliveWithoutWindows => {
            api.prevent_exit();
            lifecycle.stop_backends("last window closed");
            append_shutdown_log("staying alive without windows until reopen or quit");
        }
        ExitRequestDecision::Exit => {
            lifecycle.mark_quitting();
            append_shutdown_log(&format!("exit requested (code {code:?})"));
        }
    }
}

pub(crate) fn handle_exit_event(app_handle: &AppHandle) {
    let Some(lifecycle) = app_handle.try_state::<AppLifecycle>() else {
        return;
    };
    if !lifecycle.try_begin_exit_cleanup() {
        return;
    }
    lifecycle.shutdown_backends("application exit");
    append_shutdown_log("exit cleanup finished");
}

/// Dock icon clicked with no window open: run startup again.
#[cfg(target_os = "macos")]
pub(crate) fn handle_reopen(app_handle: &AppHandle, has_visible_windows: bool) {
    if has_visible_windows || app_handle.get_webview_window(crate::MAIN_WINDOW_LABEL).is_some() {
        return;
    }
    let Some(lifecycle) = app_handle.try_state::<AppLifecycle>() else {
        return;
    };
    if lifecycle.is_quitting() {
        return;
    }
    crate::append_startup_log("reopen requested with no windows; restarting backends");
    crate::startup_task::spawn_startup_task(app_handle.clone(), crate::append_startup_log);
}
