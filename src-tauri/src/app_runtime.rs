use tauri::{webview::PageLoadEvent, Manager, RunEvent};

use crate::{
    app_helpers, append_desktop_log, append_startup_log, backend_events, desktop_bridge,
    exit_events, logging, main_window, startup_task, AppLifecycle, DESKTOP_LOG_FILE,
};

pub(crate) fn run() {
    append_startup_log("desktop process starting");
    append_startup_log(&format!(
        "desktop log path: {}",
        logging::resolve_desktop_log_path(app_helpers::desktop_log_root(), DESKTOP_LOG_FILE)
            .display()
    ));

    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app_handle, _args, _cwd| {
            append_desktop_log("second instance launched; focusing main window");
            main_window::focus_main_window(app_handle, append_desktop_log);
        }))
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            crate::desktop_bridge_commands::get_app_path,
            crate::desktop_bridge_commands::get_user_data_path,
            crate::desktop_bridge_commands::get_voices_path,
            crate::desktop_bridge_commands::get_presets_path,
            crate::desktop_bridge_commands::get_output_path,
            crate::desktop_bridge_commands::select_file,
            crate::desktop_bridge_commands::save_file,
            crate::desktop_bridge_commands::show_notification,
            crate::desktop_bridge_commands::get_version,
            crate::desktop_bridge_commands::is_dev,
        ])
        .on_page_load(|webview, payload| {
            let event = match payload.event() {
                PageLoadEvent::Started => "started",
                PageLoadEvent::Finished => "finished",
            };
            append_desktop_log(&format!("page-load {event}: {}", payload.url()));

            let Some(lifecycle) = webview.app_handle().try_state::<AppLifecycle>() else {
                return;
            };
            if desktop_bridge::should_inject_desktop_bridge(
                &lifecycle.supervisor.ui_url(),
                payload.url(),
            ) {
                desktop_bridge::inject_desktop_bridge(webview, append_desktop_log);
            }
        })
        .setup(|app| {
            let app_handle = app.handle().clone();
            match AppLifecycle::from_environment(&app_handle) {
                Ok(lifecycle) => {
                    let events = lifecycle.supervisor.subscribe();
                    app.manage(lifecycle);
                    backend_events::spawn_backend_event_forwarder(
                        app_handle.clone(),
                        events,
                        append_desktop_log,
                    );
                    startup_task::spawn_startup_task(app_handle, append_startup_log);
                }
                Err(error) => {
                    startup_task::spawn_startup_failure(app_handle, error, append_startup_log);
                }
            }
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            RunEvent::ExitRequested { api, code, .. } => {
                exit_events::handle_exit_requested(app_handle, &api, code);
            }
            RunEvent::Exit => {
                exit_events::handle_exit_event(app_handle);
            }
            #[cfg(target_os = "macos")]
            RunEvent::Reopen {
                has_visible_windows,
                ..
            } => {
                exit_events::handle_reopen(app_handle, has_visible_windows);
            }
            _ => {}
        });
}
