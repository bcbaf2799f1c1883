use std::time::Duration;

pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const MAIN_WINDOW_TITLE: &str = "SayAs TTS";
pub(crate) const MAIN_WINDOW_WIDTH: f64 = 1400.0;
pub(crate) const MAIN_WINDOW_HEIGHT: f64 = 900.0;
pub(crate) const MAIN_WINDOW_MIN_WIDTH: f64 = 1024.0;
pub(crate) const MAIN_WINDOW_MIN_HEIGHT: f64 = 700.0;

pub(crate) const UI_PORT_ENV: &str = "SAYAS_UI_PORT";
pub(crate) const BACKEND_TIMEOUT_ENV: &str = "SAYAS_BACKEND_TIMEOUT_MS";
pub(crate) const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 60_000;
pub(crate) const REQUIRE_API_ENV: &str = "SAYAS_REQUIRE_API";
pub(crate) const APP_ROOT_ENV: &str = "SAYAS_APP_ROOT";
pub(crate) const PYTHON_ENV: &str = "SAYAS_PYTHON";
pub(crate) const UI_SCRIPT_ENV: &str = "SAYAS_UI_SCRIPT";
pub(crate) const API_SCRIPT_ENV: &str = "SAYAS_API_SCRIPT";
pub(crate) const USER_DATA_DIR_ENV: &str = "SAYAS_USER_DATA_DIR";
pub(crate) const CUDA_BIN_ENV: &str = "SAYAS_CUDA_BIN";
pub(crate) const DESKTOP_ENV_ENV: &str = "SAYAS_DESKTOP_ENV";
pub(crate) const RUNTIME_MANIFEST_RESOURCE: &str = "backend/runtime-manifest.json";
#[cfg(target_os = "windows")]
pub(crate) const DEFAULT_CUDA_BIN: &str =
    r"C:\Program Files\NVIDIA GPU Computing Toolkit\CUDA\v11.8\bin";

pub(crate) const BACKEND_ERROR_EVENT: &str = "python-error";
pub(crate) const BACKEND_EXIT_EVENT: &str = "python-exit";

pub(crate) const DESKTOP_LOG_FILE: &str = "sayas-desktop.log";
pub(crate) const DESKTOP_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub(crate) const LOG_BACKUP_COUNT: usize = 5;
pub(crate) const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
pub(crate) const BACKEND_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);
