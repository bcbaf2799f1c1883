use tauri::{AppHandle, Emitter};
use tokio::sync::broadcast::{self, error::RecvError};

use sayas_supervisor::{describe_exit, SupervisorEvent};

use crate::{BACKEND_ERROR_EVENT, BACKEND_EXIT_EVENT, MAIN_WINDOW_LABEL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BridgePush {
    Error(String),
    Exit(Option<i32>),
}

impl BridgePush {
    pub(crate) fn event_name(&self) -> &'static str {
        match self {
            Self::Error(_) => BACKEND_ERROR_EVENT,
            Self::Exit(_) => BACKEND_EXIT_EVENT,
        }
    }
}

impl From<&SupervisorEvent> for BridgePush {
    fn from(event: &SupervisorEvent) -> Self {
        match event {
            SupervisorEvent::BackendError { text, .. } => Self::Error(text.clone()),
            SupervisorEvent::BackendExited { code, .. } => Self::Exit(*code),
        }
    }
}

fn describe_event(event: &SupervisorEvent) -> String {
    match event {
        SupervisorEvent::BackendError { role, text } => format!("[{role}] stderr: {text}"),
        SupervisorEvent::BackendExited { role, code, signal } => format!(
            "[{role}] exited unexpectedly ({})",
            describe_exit(*code, signal.as_deref())
        ),
    }
}

/// Forward supervisor notifications to the main window. Delivery is
/// fire-and-forget; with no window open the push is dropped.
pub(crate) fn spawn_backend_event_forwarder<F>(
    app_handle: AppHandle,
    mut events: broadcast::Receiver<SupervisorEvent>,
    log: F,
) where
    F: Fn(&str) + Send + 'static,
{
    tauri::async_runtime::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    log(&format!("backend event forwarder skipped {skipped} events"));
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if matches!(event, SupervisorEvent::BackendExited { .. }) {
                log(&describe_event(&event));
            }
            let push = BridgePush::from(&event);
            let result = match &push {
                BridgePush::Error(text) => {
                    app_handle.emit_to(MAIN_WINDOW_LABEL, push.event_name(), text.clone())
                }
                BridgePush::Exit(code) => {
                    app_handle.emit_to(MAIN_WINDOW_LABEL, push.event_name(), *code)
                }
            };
            if let Err(error) = result {
                log(&format!(
                    "failed to emit {} to main window: {error}",
                    push.event_name()
                ));
            }
        }
    });
}
