/// Tracks whether the app is quitting for good and whether backend
/// cleanup for that final exit has already run.
#[derive(Debug, Default)]
pub(crate) struct ExitStateMachine {
    quitting: bool,
    cleanup_started: bool,
}

impl ExitStateMachine {
    pub(crate) fn mark_quitting(&mut self) {
        self.quitting = true;
    }

    pub(crate) fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Returns `true` exactly once.
    pub(crate) fn try_begin_cleanup(&mut self) -> bool {
        if self.cleanup_started {
            return false;
        }
        self.quitting = true;
        self.cleanup_started = true;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitRequestDecision {
    /// Stop the backends but keep the process alive without windows.
    KeepAliveWithoutWindows,
    Exit,
}

/// `code` is `None` when the request comes from the last window closing
/// rather than an explicit exit.
pub(crate) fn decide_exit_request(
    code: Option<i32>,
    quitting: bool,
    keep_alive_without_windows: bool,
) -> ExitRequestDecision {
    if code.is_none() && !quitting && keep_alive_without_windows {
        ExitRequestDecision::KeepAliveWithoutWindows
    } else {
        ExitRequestDecision::Exit
    }
}

pub(crate) fn platform_keeps_alive_without_windows() -> bool {
    cfg!(target_os = "macos")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_runs_once_and_marks_quitting() {
        let mut state = ExitStateMachine::default();
        assert!(!state.is_quitting());

        assert!(state.try_begin_cleanup());
        assert!(state.is_quitting());
        assert!(!state.try_begin_cleanup());
    }

    #[test]
    fn last_window_close_keeps_app_alive_only_where_platform_allows() {
        assert_eq!(
            decide_exit_request(None, false, true),
            ExitRequestDecision::KeepAliveWithoutWindows
        );
        assert_eq!(
            decide_exit_request(None, false, false),
            ExitRequestDecision::Exit
        );
    }

    #[test]
    fn explicit_exit_or_quitting_always_exits() {
        assert_eq!(
            decide_exit_request(Some(0), false, true),
            ExitRequestDecision::Exit
        );
        assert_eq!(
            decide_exit_request(None, true, true),
            ExitRequestDecision::Exit
        );
    }
}
