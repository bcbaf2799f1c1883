use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};
use url::Url;

use crate::{
    MAIN_WINDOW_HEIGHT, MAIN_WINDOW_LABEL, MAIN_WINDOW_MIN_HEIGHT, MAIN_WINDOW_MIN_WIDTH,
    MAIN_WINDOW_TITLE, MAIN_WINDOW_WIDTH,
};

/// Open the single main window on `ui_url`, or point the existing one there.
///
/// Must not be called from the main thread on Windows; window creation
/// deadlocks there.
pub(crate) fn open_main_window<F>(app_handle: &AppHandle, ui_url: &str, log: F) -> Result<(), String>
where
    F: Fn(&str),
{
    let url = Url::parse(ui_url).map_err(|error| format!("Invalid UI URL {ui_url}: {error}"))?;

    if let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) {
        log(&format!("main window already open; navigating to {url}"));
        window
            .navigate(url)
            .map_err(|error| format!("Failed to navigate main window: {error}"))?;
        if let Err(error) = window.show() {
            log(&format!("failed to show main window: {error}"));
        }
        if let Err(error) = window.set_focus() {
            log(&format!("failed to focus main window: {error}"));
        }
        return Ok(());
    }

    WebviewWindowBuilder::new(app_handle, MAIN_WINDOW_LABEL, WebviewUrl::External(url))
        .title(MAIN_WINDOW_TITLE)
        .inner_size(MAIN_WINDOW_WIDTH, MAIN_WINDOW_HEIGHT)
        .min_inner_size(MAIN_WINDOW_MIN_WIDTH, MAIN_WINDOW_MIN_HEIGHT)
        .center()
        .build()
        .map_err(|error| format!("Failed to create main window: {error}"))?;
    log(&format!("main window opened at {ui_url}"));
    Ok(())
}

pub(crate) fn focus_main_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        log("focus skipped: main window not open yet");
        return;
    };
    if let Err(error) = window.unminimize() {
        log(&format!("failed to unminimize main window: {error}"));
    }
    if let Err(error) = window.show() {
        log(&format!("failed to show main window: {error}"));
    }
    if let Err(error) = window.set_focus() {
        log(&format!("failed to focus main window: {error}"));
    }
}
