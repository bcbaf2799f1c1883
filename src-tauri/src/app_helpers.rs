use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock},
};

use sayas_supervisor::LogSink;

use crate::{
    logging::{self, DesktopLogCategory},
    runtime_paths, DESKTOP_LOG_FILE, DESKTOP_LOG_MAX_BYTES, LOG_BACKUP_COUNT,
};

static DESKTOP_LOG_WRITE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
static DESKTOP_LOG_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// Send every later log line to `<user_data>/logs/`. Only the first call counts.
pub(crate) fn pin_desktop_log_root(user_data: &Path) {
    if DESKTOP_LOG_ROOT.set(user_data.to_path_buf()).is_err() {
        append_desktop_log("desktop log root already set; keeping the first one");
    }
}

/// The resolved user-data root once known, else the pre-setup default.
pub(crate) fn desktop_log_root() -> Option<PathBuf> {
    DESKTOP_LOG_ROOT
        .get()
        .cloned()
        .or_else(runtime_paths::default_user_data_dir)
}

pub(crate) fn append_desktop_log(message: &str) {
    append_desktop_log_with_category(DesktopLogCategory::Runtime, message);
}

pub(crate) fn append_startup_log(message: &str) {
    append_desktop_log_with_category(DesktopLogCategory::Startup, message);
}

pub(crate) fn append_backend_log(message: &str) {
    append_desktop_log_with_category(DesktopLogCategory::Backend, message);
}

pub(crate) fn append_shutdown_log(message: &str) {
    append_desktop_log_with_category(DesktopLogCategory::Shutdown, message);
}

/// Sink handed to the supervisor; child output lands in the desktop log.
pub(crate) fn backend_log_sink() -> LogSink {
    Arc::new(append_backend_log)
}

fn append_desktop_log_with_category(category: DesktopLogCategory, message: &str) {
    logging::append_desktop_log(
        category,
        message,
        desktop_log_root(),
        DESKTOP_LOG_FILE,
        DESKTOP_LOG_MAX_BYTES,
        LOG_BACKUP_COUNT,
        &DESKTOP_LOG_WRITE_LOCK,
    )
}
