//! Startup ordering, readiness detection and teardown of the two backends

use std::{
    future,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::Instant,
};

use crate::{
    child::ChildProcessHandle,
    config::SupervisorConfig,
    error::{describe_exit, Result, SupervisorError},
    readiness::ReadinessProbe,
    types::{
        BackendRole, ChildEvent, LogSink, OutputStream, SupervisorEvent, SupervisorPhase,
    },
};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(25);

type EventReceiver = mpsc::UnboundedReceiver<ChildEvent>;

#[derive(Debug)]
struct SupervisorState {
    phase: SupervisorPhase,
    api: Option<ChildProcessHandle>,
    ui: Option<ChildProcessHandle>,
    readiness_observed: bool,
    start_deadline: Option<Instant>,
    /// Bumped by every `stop()`; a startup attempt only commits results for its own generation.
    generation: u64,
    cancel: Option<oneshot::Sender<()>>,
    /// Handles already asked to terminate that may still be running.
    stopping: Vec<ChildProcessHandle>,
}

impl Default for SupervisorState {
    fn default() -> Self {
        Self {
            phase: SupervisorPhase::Idle,
            api: None,
            ui: None,
            readiness_observed: false,
            start_deadline: None,
            generation: 0,
            cancel: None,
            stopping: Vec::new(),
        }
    }
}

impl SupervisorState {
    fn has_live_handles(&self) -> bool {
        self.api.as_ref().is_some_and(ChildProcessHandle::is_live)
            || self.ui.as_ref().is_some_and(ChildProcessHandle::is_live)
    }
}

struct StartupAttempt {
    generation: u64,
    ui_events: EventReceiver,
    api_events: Option<EventReceiver>,
    cancel: oneshot::Receiver<()>,
    deadline: Instant,
}

enum StartupOutcome {
    Ready,
    Cancelled,
    Failed(SupervisorError),
}

/// Owns the API and UI backend processes for the lifetime of the app.
pub struct BackendSupervisor {
    config: SupervisorConfig,
    probe: ReadinessProbe,
    log: LogSink,
    state: Arc<Mutex<SupervisorState>>,
    events: broadcast::Sender<SupervisorEvent>,
}

impl BackendSupervisor {
    pub fn new(config: SupervisorConfig, log: LogSink) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            probe: ReadinessProbe::for_port(config.ui_port),
            config,
            log,
            state: Arc::new(Mutex::new(SupervisorState::default())),
            events,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn ui_url(&self) -> String {
        self.config.ui_url()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> SupervisorPhase {
        self.lock_state().phase
    }

    pub fn readiness_observed(&self) -> bool {
        self.lock_state().readiness_observed
    }

    pub fn start_deadline(&self) -> Option<Instant> {
        self.lock_state().start_deadline
    }

    /// Roles of the current backends whose process is still running.
    ///
    /// Backends already handed to `stop()` are not counted.
    pub fn live_roles(&self) -> Vec<BackendRole> {
        let state = self.lock_state();
        [state.api.as_ref(), state.ui.as_ref()]
            .into_iter()
            .flatten()
            .filter(|handle| handle.is_live())
            .map(ChildProcessHandle::role)
            .collect()
    }

    /// Run one startup attempt: API (optional) first, then UI, then wait for
    /// the UI readiness line, a UI exit, the timeout or `stop()`.
    pub async fn start(&self) -> Result<()> {
        let attempt = self.begin_attempt()?;
        let StartupAttempt {
            generation,
            mut ui_events,
            mut api_events,
            mut cancel,
            deadline,
        } = attempt;

        let outcome = loop {
            tokio::select! {
                biased;
                _ = &mut cancel => break StartupOutcome::Cancelled,
                event = ui_events.recv() => {
                    if let Some(outcome) = self.on_startup_ui_event(event) {
                        break outcome;
                    }
                }
                event = recv_optional(&mut api_events) => {
                    let finished = !matches!(event, Some(ChildEvent::OutputLine { .. }));
                    let failure = self.on_startup_api_event(event);
                    if finished {
                        api_events = None;
                    }
                    if let Some(error) = failure {
                        break StartupOutcome::Failed(error);
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    break StartupOutcome::Failed(SupervisorError::StartupTimeout {
                        role: BackendRole::Ui,
                        after_ms: self.config.startup_timeout.as_millis() as u64,
                    });
                }
            }
        };

        self.finish_attempt(generation, outcome, ui_events, api_events)
    }

    /// Terminate every live backend (UI first) and return to `Idle`.
    ///
    /// Safe from any phase; a pending `start()` resolves with `Cancelled`.
    pub fn stop(&self) {
        let handles = self.take_for_stop();
        for handle in &handles {
            handle.terminate();
        }
        let mut state = self.lock_state();
        state.stopping.retain(|handle| handle.is_live());
        state
            .stopping
            .extend(handles.into_iter().filter(|handle| handle.is_live()));
    }

    /// `stop()`, then wait up to `grace` for the children to exit, including
    /// those an earlier `stop()` left terminating.
    ///
    /// Returns the roles still running when the grace period ran out.
    pub async fn shutdown(&self, grace: Duration) -> Vec<BackendRole> {
        let mut handles = self.take_for_stop();
        handles.extend(std::mem::take(&mut self.lock_state().stopping));
        for handle in &handles {
            handle.terminate();
        }

        let deadline = Instant::now() + grace;
        loop {
            let remaining: Vec<BackendRole> = handles
                .iter()
                .filter(|handle| handle.is_live())
                .map(ChildProcessHandle::role)
                .collect();
            if remaining.is_empty() || Instant::now() >= deadline {
                if !remaining.is_empty() {
                    (self.log)(&format!(
                        "backends {remaining:?} still running {}ms after shutdown",
                        grace.as_millis()
                    ));
                }
                return remaining;
            }
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
    }

    fn take_for_stop(&self) -> Vec<ChildProcessHandle> {
        let (ui, api, cancel, previous) = {
            let mut state = self.lock_state();
            let previous = state.phase;
            state.generation += 1;
            state.phase = SupervisorPhase::Idle;
            state.readiness_observed = false;
            state.start_deadline = None;
            (
                state.ui.take(),
                state.api.take(),
                state.cancel.take(),
                previous,
            )
        };

        if let Some(cancel) = cancel {
            let _ = cancel.send(());
        }
        if previous != SupervisorPhase::Idle || ui.is_some() || api.is_some() {
            (self.log)(&format!("stopping backends (phase was {previous:?})"));
        }
        // UI first, then API.
        [ui, api].into_iter().flatten().collect()
    }

    fn lock_state(&self) -> MutexGuard<'_, SupervisorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(error) => {
                (self.log)("supervisor state lock poisoned; recovering");
                error.into_inner()
            }
        }
    }

    fn begin_attempt(&self) -> Result<StartupAttempt> {
        let mut state = self.lock_state();
        if state.phase.is_starting() {
            return Err(SupervisorError::AlreadyStarting);
        }
        if state.has_live_handles() {
            return Err(SupervisorError::AlreadyRunning);
        }
        state.api = None;
        state.ui = None;
        state.readiness_observed = false;
        state.start_deadline = None;

        let specs = match self.config.validate() {
            Ok(specs) => specs,
            Err(error) => {
                (self.log)(&format!("backend startup aborted: {error}"));
                state.phase = SupervisorPhase::Failed;
                return Err(error);
            }
        };

        let mut api_events = None;
        let mut ui_events = None;
        for spec in specs {
            state.phase = match spec.role {
                BackendRole::Api => SupervisorPhase::StartingApi,
                BackendRole::Ui => SupervisorPhase::StartingUi,
            };
            match ChildProcessHandle::spawn(
                &spec,
                self.config.output_drain_timeout,
                self.log.clone(),
            ) {
                Ok((handle, events)) => match spec.role {
                    BackendRole::Api => {
                        state.api = Some(handle);
                        api_events = Some(events);
                    }
                    BackendRole::Ui => {
                        state.ui = Some(handle);
                        ui_events = Some(events);
                    }
                },
                Err(error) if spec.role == BackendRole::Api && !self.config.require_api => {
                    (self.log)(&format!("continuing without api backend: {error}"));
                }
                Err(error) => {
                    (self.log)(&format!("backend startup failed: {error}"));
                    state.phase = SupervisorPhase::Failed;
                    if let Some(api_events) = api_events {
                        self.spawn_monitor(BackendRole::Api, api_events);
                    }
                    return Err(error);
                }
            }
        }

        let Some(ui_events) = ui_events else {
            // validate() always yields the UI spec
            state.phase = SupervisorPhase::Failed;
            return Err(SupervisorError::MissingDependency {
                role: BackendRole::Ui,
                path: self.config.ui_script.clone(),
            });
        };

        let deadline = Instant::now() + self.config.startup_timeout;
        let (cancel_tx, cancel_rx) = oneshot::channel();
        state.phase = SupervisorPhase::AwaitingReadiness;
        state.start_deadline = Some(deadline);
        state.cancel = Some(cancel_tx);
        (self.log)(&format!(
            "waiting up to {}ms for '{}' in ui output",
            self.config.startup_timeout.as_millis(),
            self.probe.endpoint()
        ));

        Ok(StartupAttempt {
            generation: state.generation,
            ui_events,
            api_events,
            cancel: cancel_rx,
            deadline,
        })
    }

    fn on_startup_ui_event(&self, event: Option<ChildEvent>) -> Option<StartupOutcome> {
        match event {
            Some(ChildEvent::OutputLine {
                stream: OutputStream::Stdout,
                text,
            }) => self.probe.matches(&text).then_some(StartupOutcome::Ready),
            Some(ChildEvent::OutputLine {
                stream: OutputStream::Stderr,
                text,
            }) => {
                self.publish(SupervisorEvent::BackendError {
                    role: BackendRole::Ui,
                    text,
                });
                None
            }
            Some(ChildEvent::Exited { code, signal, .. }) => {
                Some(StartupOutcome::Failed(SupervisorError::PrematureExit {
                    role: BackendRole::Ui,
                    code,
                    signal,
                }))
            }
            Some(ChildEvent::SpawnFailed { reason }) => {
                Some(StartupOutcome::Failed(SupervisorError::Spawn {
                    role: BackendRole::Ui,
                    message: reason,
                }))
            }
            None => Some(StartupOutcome::Failed(SupervisorError::PrematureExit {
                role: BackendRole::Ui,
                code: None,
                signal: None,
            })),
        }
    }

    /// Returns the startup failure an API event causes, if any.
    fn on_startup_api_event(&self, event: Option<ChildEvent>) -> Option<SupervisorError> {
        let failure = match event {
            Some(ChildEvent::OutputLine {
                stream: OutputStream::Stderr,
                text,
            }) => {
                self.publish(SupervisorEvent::BackendError {
                    role: BackendRole::Api,
                    text,
                });
                None
            }
            Some(ChildEvent::OutputLine { .. }) | None => None,
            Some(ChildEvent::Exited {
                code,
                signal,
                requested,
            }) => {
                if !requested {
                    self.publish(SupervisorEvent::BackendExited {
                        role: BackendRole::Api,
                        code,
                        signal: signal.clone(),
                    });
                }
                Some(SupervisorError::PrematureExit {
                    role: BackendRole::Api,
                    code,
                    signal,
                })
            }
            Some(ChildEvent::SpawnFailed { reason }) => {
                self.publish(SupervisorEvent::BackendError {
                    role: BackendRole::Api,
                    text: reason.clone(),
                });
                Some(SupervisorError::Spawn {
                    role: BackendRole::Api,
                    message: reason,
                })
            }
        };

        match failure {
            Some(error) if self.config.require_api => Some(error),
            Some(error) => {
                (self.log)(&format!("api backend is down, ui startup continues: {error}"));
                None
            }
            None => None,
        }
    }

    fn finish_attempt(
        &self,
        generation: u64,
        outcome: StartupOutcome,
        ui_events: EventReceiver,
        api_events: Option<EventReceiver>,
    ) -> Result<()> {
        let mut state = self.lock_state();
        if state.generation != generation {
            drop(state);
            (self.log)("backend startup cancelled by stop()");
            return Err(SupervisorError::Cancelled);
        }
        state.cancel = None;
        state.start_deadline = None;

        let result = match outcome {
            StartupOutcome::Ready => {
                state.phase = SupervisorPhase::Ready;
                state.readiness_observed = true;
                (self.log)(&format!("ui backend ready at {}", self.config.ui_url()));
                Ok(())
            }
            StartupOutcome::Cancelled => {
                state.phase = SupervisorPhase::Idle;
                Err(SupervisorError::Cancelled)
            }
            StartupOutcome::Failed(error) => {
                state.phase = SupervisorPhase::Failed;
                if let SupervisorError::PrematureExit { role, code, signal } = &error {
                    (self.log)(&format!(
                        "{role} backend exited during startup ({})",
                        describe_exit(*code, signal.as_deref())
                    ));
                } else {
                    (self.log)(&format!("backend startup failed: {error}"));
                }
                Err(error)
            }
        };
        drop(state);

        self.spawn_monitor(BackendRole::Ui, ui_events);
        if let Some(api_events) = api_events {
            self.spawn_monitor(BackendRole::Api, api_events);
        }
        result
    }

    fn publish(&self, event: SupervisorEvent) {
        // No subscribers is fine: nothing is listening yet.
        let _ = self.events.send(event);
    }

    /// Keep draining a backend's events once startup no longer looks at them.
    fn spawn_monitor(&self, role: BackendRole, mut events: EventReceiver) {
        let sender = self.events.clone();
        let log = self.log.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    ChildEvent::OutputLine {
                        stream: OutputStream::Stderr,
                        text,
                    } => {
                        let _ = sender.send(SupervisorEvent::BackendError { role, text });
                    }
                    ChildEvent::OutputLine { .. } => {}
                    ChildEvent::Exited {
                        code,
                        signal,
                        requested,
                    } => {
                        if !requested {
                            log(&format!(
                                "{role} backend exited unexpectedly ({})",
                                describe_exit(code, signal.as_deref())
                            ));
                            let _ = sender.send(SupervisorEvent::BackendExited {
                                role,
                                code,
                                signal,
                            });
                        }
                        break;
                    }
                    ChildEvent::SpawnFailed { reason } => {
                        let _ = sender.send(SupervisorEvent::BackendError { role, text: reason });
                        break;
                    }
                }
            }
        });
    }
}

impl std::fmt::Debug for BackendSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSupervisor")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .finish()
    }
}

async fn recv_optional(events: &mut Option<EventReceiver>) -> Option<ChildEvent> {
    match events {
        Some(events) => events.recv().await,
        None => future::pending().await,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::{
        fs,
        path::{Path, PathBuf},
        time::Duration,
    };

    const READY_LINE: &str = "Server running at http://localhost:7860";

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().expect("tempdir"),
            }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn script(&self, name: &str, body: &str) -> PathBuf {
            let path = self.path(name);
            fs::write(&path, body).expect("write script");
            path
        }

        fn config(&self, ui_body: &str) -> SupervisorConfig {
            let ui = self.script("webui.sh", ui_body);
            SupervisorConfig::new("/bin/sh", ui, self.dir.path())
                .api_script(self.path("api.sh"))
                .startup_timeout(Duration::from_secs(10))
        }
    }

    fn supervisor(config: SupervisorConfig) -> BackendSupervisor {
        BackendSupervisor::new(config, Arc::new(|_: &str| {}))
    }

    async fn wait_for_pid_exit(pid_file: &Path) {
        use nix::{sys::signal::kill, unistd::Pid};

        let pid: i32 = fs::read_to_string(pid_file)
            .expect("pid file")
            .trim()
            .parse()
            .expect("pid");
        for _ in 0..100 {
            if kill(Pid::from_raw(pid), None).is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("process {pid} still alive after stop()");
    }

    async fn next_event(
        events: &mut broadcast::Receiver<SupervisorEvent>,
    ) -> SupervisorEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event in time")
            .expect("event channel open")
    }

    #[tokio::test]
    async fn ui_only_startup_succeeds_and_stop_leaves_no_process() {
        let fixture = Fixture::new();
        let ui_pid = fixture.path("ui.pid");
        let config = fixture.config(&format!(
            "echo $$ > '{}'\necho booting\necho '{READY_LINE}'\necho '{READY_LINE}'\nexec sleep 30\n",
            ui_pid.display()
        ));
        let supervisor = supervisor(config);

        supervisor.start().await.expect("startup should succeed");
        assert_eq!(supervisor.phase(), SupervisorPhase::Ready);
        assert!(supervisor.readiness_observed());
        assert_eq!(supervisor.live_roles(), vec![BackendRole::Ui]);

        supervisor.stop();
        assert_eq!(supervisor.phase(), SupervisorPhase::Idle);
        assert!(supervisor.live_roles().is_empty());
        wait_for_pid_exit(&ui_pid).await;

        supervisor.stop();
        assert_eq!(supervisor.phase(), SupervisorPhase::Idle);
    }

    #[tokio::test]
    async fn readiness_line_before_exit_wins() {
        let fixture = Fixture::new();
        let supervisor =
            supervisor(fixture.config("echo 'http://localhost:7860/docs'\nexit 1\n"));

        assert_eq!(supervisor.start().await, Ok(()));
        assert_eq!(supervisor.phase(), SupervisorPhase::Ready);
    }

    #[tokio::test]
    async fn exit_without_readiness_is_premature_exit() {
        let fixture = Fixture::new();
        let supervisor = supervisor(fixture.config("echo 'loading models'\nexit 1\n"));

        assert_eq!(
            supervisor.start().await,
            Err(SupervisorError::PrematureExit {
                role: BackendRole::Ui,
                code: Some(1),
                signal: None,
            })
        );
        assert_eq!(supervisor.phase(), SupervisorPhase::Failed);
        assert!(supervisor.live_roles().is_empty());
    }

    #[tokio::test]
    async fn other_port_does_not_count_as_ready() {
        let fixture = Fixture::new();
        let supervisor = supervisor(fixture.config("echo 'http://localhost:8765/docs'\nexit 0\n"));

        assert!(matches!(
            supervisor.start().await,
            Err(SupervisorError::PrematureExit { code: Some(0), .. })
        ));
    }

    #[tokio::test]
    async fn timeout_fails_startup_and_leaves_ui_running() {
        let fixture = Fixture::new();
        let config = fixture
            .config("exec sleep 30\n")
            .startup_timeout(Duration::from_millis(300));
        let supervisor = supervisor(config);

        assert_eq!(
            supervisor.start().await,
            Err(SupervisorError::StartupTimeout {
                role: BackendRole::Ui,
                after_ms: 300,
            })
        );
        assert_eq!(supervisor.phase(), SupervisorPhase::Failed);
        assert_eq!(supervisor.live_roles(), vec![BackendRole::Ui]);
        assert!(supervisor.start_deadline().is_none());

        supervisor.stop();
        assert_eq!(supervisor.phase(), SupervisorPhase::Idle);
        assert!(supervisor.live_roles().is_empty());
    }

    #[tokio::test]
    async fn missing_dependency_spawns_nothing() {
        let fixture = Fixture::new();
        let marker = fixture.path("api-started");
        fixture.script("api.sh", &format!("touch '{}'\nexec sleep 30\n", marker.display()));
        let config = SupervisorConfig::new("/bin/sh", fixture.path("webui.sh"), fixture.dir.path())
            .api_script(fixture.path("api.sh"));
        let supervisor = supervisor(config);

        assert_eq!(
            supervisor.start().await,
            Err(SupervisorError::MissingDependency {
                role: BackendRole::Ui,
                path: fixture.path("webui.sh"),
            })
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!marker.exists());
        assert!(supervisor.live_roles().is_empty());
        assert_eq!(supervisor.phase(), SupervisorPhase::Failed);
    }

    #[tokio::test]
    async fn concurrent_start_is_rejected_and_stop_cancels_pending_start() {
        let fixture = Fixture::new();
        let supervisor = Arc::new(supervisor(fixture.config("exec sleep 30\n")));

        let pending = tokio::spawn({
            let supervisor = supervisor.clone();
            async move { supervisor.start().await }
        });
        for _ in 0..100 {
            if supervisor.phase() == SupervisorPhase::AwaitingReadiness {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(supervisor.phase(), SupervisorPhase::AwaitingReadiness);
        assert_eq!(supervisor.start().await, Err(SupervisorError::AlreadyStarting));

        supervisor.stop();
        let result = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .expect("pending start resolves")
            .expect("start task");
        assert_eq!(result, Err(SupervisorError::Cancelled));
        assert_eq!(supervisor.phase(), SupervisorPhase::Idle);
    }

    #[tokio::test]
    async fn start_while_running_requires_stop_first() {
        let fixture = Fixture::new();
        let supervisor =
            supervisor(fixture.config(&format!("echo '{READY_LINE}'\nexec sleep 30\n")));

        supervisor.start().await.expect("first start");
        assert_eq!(supervisor.start().await, Err(SupervisorError::AlreadyRunning));

        supervisor.stop();
        tokio::time::sleep(Duration::from_millis(100)).await;
        supervisor.start().await.expect("restart after stop");
        supervisor.stop();
    }

    #[tokio::test]
    async fn stop_from_idle_is_a_no_op() {
        let fixture = Fixture::new();
        let supervisor = supervisor(fixture.config("exit 0\n"));

        supervisor.stop();
        supervisor.stop();
        assert_eq!(supervisor.phase(), SupervisorPhase::Idle);
        assert!(!supervisor.readiness_observed());
    }

    #[tokio::test]
    async fn exit_after_ready_is_reported_to_subscribers() {
        let fixture = Fixture::new();
        let supervisor = supervisor(fixture.config(&format!(
            "echo '{READY_LINE}'\nsleep 0.3\necho 'cuda warning' >&2\nexit 4\n"
        )));
        let mut events = supervisor.subscribe();

        supervisor.start().await.expect("startup");
        assert_eq!(
            next_event(&mut events).await,
            SupervisorEvent::BackendError {
                role: BackendRole::Ui,
                text: "cuda warning".to_string(),
            }
        );
        assert_eq!(
            next_event(&mut events).await,
            SupervisorEvent::BackendExited {
                role: BackendRole::Ui,
                code: Some(4),
                signal: None,
            }
        );
        // Not stopped automatically: still Ready until the host decides.
        assert_eq!(supervisor.phase(), SupervisorPhase::Ready);
    }

    #[tokio::test]
    async fn api_exit_is_reported_but_not_fatal_by_default() {
        let fixture = Fixture::new();
        fixture.script("api.sh", "exit 2\n");
        let supervisor = supervisor(fixture.config(&format!(
            "sleep 0.3\necho '{READY_LINE}'\nexec sleep 30\n"
        )));
        let mut events = supervisor.subscribe();

        supervisor.start().await.expect("ui startup succeeds");
        assert_eq!(
            next_event(&mut events).await,
            SupervisorEvent::BackendExited {
                role: BackendRole::Api,
                code: Some(2),
                signal: None,
            }
        );
        supervisor.stop();
    }

    #[tokio::test]
    async fn api_exit_fails_startup_when_required() {
        let fixture = Fixture::new();
        fixture.script("api.sh", "exit 2\n");
        let config = fixture.config("exec sleep 30\n").require_api(true);
        let supervisor = supervisor(config);

        assert_eq!(
            supervisor.start().await,
            Err(SupervisorError::PrematureExit {
                role: BackendRole::Api,
                code: Some(2),
                signal: None,
            })
        );
        assert_eq!(supervisor.live_roles(), vec![BackendRole::Ui]);
        supervisor.stop();
        assert!(supervisor.live_roles().is_empty());
    }

    #[tokio::test]
    async fn shutdown_after_stop_still_waits_for_stopped_children() {
        use nix::{
            sys::signal::{kill, Signal},
            unistd::Pid,
        };

        let fixture = Fixture::new();
        let ui_pid = fixture.path("ui.pid");
        let supervisor = supervisor(fixture.config(&format!(
            "echo $$ > '{}'\ntrap '' TERM\necho '{READY_LINE}'\nexec sleep 30\n",
            ui_pid.display()
        )));

        supervisor.start().await.expect("startup should succeed");
        supervisor.stop();
        assert!(supervisor.live_roles().is_empty());

        let started = Instant::now();
        let remaining = supervisor.shutdown(Duration::from_millis(300)).await;
        assert_eq!(remaining, vec![BackendRole::Ui]);
        assert!(started.elapsed() >= Duration::from_millis(300));

        // SIGTERM is ignored by this backend.
        let pid: i32 = fs::read_to_string(&ui_pid)
            .expect("pid file")
            .trim()
            .parse()
            .expect("pid");
        kill(Pid::from_raw(pid), Signal::SIGKILL).expect("sigkill");
        wait_for_pid_exit(&ui_pid).await;
    }

    #[tokio::test]
    async fn deadline_passing_after_ready_changes_nothing() {
        let fixture = Fixture::new();
        let config = fixture
            .config(&format!(
                "echo '{READY_LINE}'\necho '{READY_LINE}'\nexec sleep 30\n"
            ))
            .startup_timeout(Duration::from_millis(200));
        let supervisor = supervisor(config);
        let mut events = supervisor.subscribe();

        assert_eq!(supervisor.start().await, Ok(()));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(supervisor.phase(), SupervisorPhase::Ready);
        assert!(supervisor.readiness_observed());
        assert!(supervisor.start_deadline().is_none());
        assert_eq!(supervisor.live_roles(), vec![BackendRole::Ui]);
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        supervisor.stop();
    }

    #[tokio::test]
    async fn non_executable_interpreter_is_a_spawn_error() {
        let fixture = Fixture::new();
        let python = fixture.script("python", "not a program\n");
        let ui = fixture.script("webui.sh", "exec sleep 30\n");
        let supervisor = supervisor(SupervisorConfig::new(python, ui, fixture.dir.path()));

        assert!(matches!(
            supervisor.start().await,
            Err(SupervisorError::Spawn {
                role: BackendRole::Ui,
                ..
            })
        ));
        assert_eq!(supervisor.phase(), SupervisorPhase::Failed);
        assert!(supervisor.live_roles().is_empty());
    }

    #[tokio::test]
    async fn shutdown_waits_for_children_to_exit() {
        let fixture = Fixture::new();
        fixture.script("api.sh", "exec sleep 30\n");
        let supervisor = supervisor(
            fixture.config(&format!("echo '{READY_LINE}'\nexec sleep 30\n")),
        );

        supervisor.start().await.expect("startup should succeed");
        assert_eq!(
            supervisor.live_roles(),
            vec![BackendRole::Api, BackendRole::Ui]
        );

        let remaining = supervisor.shutdown(Duration::from_secs(5)).await;
        assert!(remaining.is_empty());
        assert_eq!(supervisor.phase(), SupervisorPhase::Idle);
        assert!(supervisor.shutdown(Duration::from_millis(10)).await.is_empty());
    }
}
