use std::path::PathBuf;
use tauri::{AppHandle, Manager, State};
use tauri_plugin_dialog::{DialogExt, FileDialogBuilder, FilePath};
use tokio::sync::oneshot;

use crate::{
    append_desktop_log,
    dialog_options::{
        self, NotificationSeverity, OpenDialogOptions, OpenDialogResult, SaveDialogOptions,
        SaveDialogResult,
    },
    runtime_paths::path_to_string,
    AppLifecycle,
};

#[tauri::command]
pub(crate) fn get_app_path(lifecycle: State<'_, AppLifecycle>) -> String {
    path_to_string(&lifecycle.paths.app_root)
}

#[tauri::command]
pub(crate) fn get_user_data_path(lifecycle: State<'_, AppLifecycle>) -> String {
    path_to_string(&lifecycle.paths.user_data)
}

#[tauri::command]
pub(crate) fn get_voices_path(lifecycle: State<'_, AppLifecycle>) -> String {
    path_to_string(&lifecycle.paths.voices)
}

#[tauri::command]
pub(crate) fn get_presets_path(lifecycle: State<'_, AppLifecycle>) -> String {
    path_to_string(&lifecycle.paths.presets)
}

#[tauri::command]
pub(crate) fn get_output_path(lifecycle: State<'_, AppLifecycle>) -> String {
    path_to_string(&lifecycle.paths.output)
}

#[tauri::command]
pub(crate) fn get_version(app_handle: AppHandle) -> String {
    app_handle.package_info().version.to_string()
}

#[tauri::command]
pub(crate) fn is_dev(lifecycle: State<'_, AppLifecycle>) -> bool {
    lifecycle.dev_mode
}

#[tauri::command]
pub(crate) fn show_notification(message: String, severity: Option<String>) -> bool {
    let severity = NotificationSeverity::parse(severity.as_deref());
    append_desktop_log(&format!("notification [{}]: {}", severity.as_str(), message));
    true
}

#[tauri::command]
pub(crate) async fn select_file(
    app_handle: AppHandle,
    options: Option<OpenDialogOptions>,
) -> OpenDialogResult {
    let options = options.unwrap_or_default();
    let (directory, file_name) = dialog_options::split_default_path(options.default_path.as_deref());
    let builder = configure_dialog(
        app_handle.dialog().file(),
        options.title.as_deref(),
        directory,
        file_name,
        &options.filters,
    );

    let (tx, rx) = oneshot::channel::<Vec<FilePath>>();
    match (options.wants_directory(), options.wants_multiple()) {
        (true, _) => builder.pick_folder(move |folder| {
            let _ = tx.send(folder.into_iter().collect());
        }),
        (false, true) => builder.pick_files(move |files| {
            let _ = tx.send(files.unwrap_or_default());
        }),
        (false, false) => builder.pick_file(move |file| {
            let _ = tx.send(file.into_iter().collect());
        }),
    }

    let selection = match rx.await {
        Ok(selection) => selection,
        Err(_) => {
            append_desktop_log("file dialog closed without reporting a selection");
            Vec::new()
        }
    };
    OpenDialogResult::from_selection(selection.iter().map(FilePath::to_string).collect())
}

#[tauri::command]
pub(crate) async fn save_file(
    app_handle: AppHandle,
    options: Option<SaveDialogOptions>,
) -> SaveDialogResult {
    let options = options.unwrap_or_default();
    let (directory, file_name) = dialog_options::split_default_path(options.default_path.as_deref());
    let builder = configure_dialog(
        app_handle.dialog().file(),
        options.title.as_deref(),
        directory,
        file_name,
        &options.filters,
    );

    let (tx, rx) = oneshot::channel::<Option<FilePath>>();
    builder.save_file(move |file| {
        let _ = tx.send(file);
    });

    let selection = match rx.await {
        Ok(selection) => selection,
        Err(_) => {
            append_desktop_log("save dialog closed without reporting a selection");
            None
        }
    };
    SaveDialogResult::from_selection(selection.map(|file| file.to_string()))
}

fn configure_dialog(
    mut builder: FileDialogBuilder<tauri::Wry>,
    title: Option<&str>,
    directory: Option<PathBuf>,
    file_name: Option<String>,
    filters: &[dialog_options::FileFilter],
) -> FileDialogBuilder<tauri::Wry> {
    if let Some(title) = title {
        builder = builder.set_title(title);
    }
    if let Some(directory) = directory {
        builder = builder.set_directory(directory);
    }
    if let Some(file_name) = file_name {
        builder = builder.set_file_name(file_name);
    }
    for filter in filters.iter().filter(|filter| !filter.extensions.is_empty()) {
        let extensions: Vec<&str> = filter.extensions.iter().map(String::as_str).collect();
        builder = builder.add_filter(&filter.name, &extensions);
    }
    builder
}
