#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_helpers;
mod app_runtime;
mod app_types;
mod backend_config;
mod backend_env;
mod backend_events;
mod desktop_bridge;
mod desktop_bridge_commands;
mod dialog_options;
mod exit_events;
mod exit_state;
mod launch_plan;
mod logging;
mod main_window;
mod runtime_paths;
mod startup_task;

pub(crate) use app_constants::*;
pub(crate) use app_helpers::{
    append_desktop_log, append_shutdown_log, append_startup_log, backend_log_sink,
};
pub(crate) use app_types::{AppLifecycle, AtomicFlagGuard};

fn main() {
    app_runtime::run();
}
