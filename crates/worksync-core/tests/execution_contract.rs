use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use worksync_core::execution::{
    CommandSpec, ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput,
    ProcessSignaller, ProcessSpawnRequest, ProcessTerminationMode, ProcessWaitFuture,
    RunningProcess, StdioMode, spawn_validated,
};
use worksync_core::models::{CoreError, CoreErrorKind, ProcessRole};
use worksync_core::supervisor::{LaunchConfig, ShutdownSignal, Supervisor, SyncServerShutdown};

#[derive(Clone, Debug, Eq, PartialEq)]
enum Event {
    Spawned(ProcessRole),
    Terminated(ProcessRole, ProcessTerminationMode),
}

#[derive(Clone)]
struct FakeExecutor {
    events: Arc<Mutex<Vec<Event>>>,
    requests: Arc<Mutex<Vec<ProcessSpawnRequest>>>,
    ui_status: ProcessExitStatus,
    sync_already_exited: Option<ProcessExitStatus>,
}

impl FakeExecutor {
    fn new(ui_status: ProcessExitStatus) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            ui_status,
            sync_already_exited: None,
        }
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    fn requests(&self) -> Vec<ProcessSpawnRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

struct FakeProcess {
    role: ProcessRole,
    status: ProcessExitStatus,
    already_exited: Option<ProcessExitStatus>,
    events: Arc<Mutex<Vec<Event>>>,
}

impl RunningProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn signaller(&self) -> ProcessSignaller {
        ProcessSignaller {
            role: self.role,
            pid: None,
            process_group: false,
        }
    }

    fn terminate(&self, mode: ProcessTerminationMode) -> ExecutionResult<()> {
        let mut events = self.events.lock().map_err(|_| {
            CoreError::new(CoreErrorKind::Internal, "terminate lock poisoned")
        })?;
        events.push(Event::Terminated(self.role, mode));
        Ok(())
    }

    fn try_status(&self) -> ExecutionResult<Option<ProcessExitStatus>> {
        Ok(self.already_exited)
    }

    fn wait(self: Box<Self>) -> ProcessWaitFuture {
        let now = SystemTime::now();
        let output = ProcessOutput {
            status: self.status,
            stdout: Vec::new(),
            stderr: Vec::new(),
            started_at: now,
            finished_at: now,
        };
        Box::pin(async move { Ok(output) })
    }
}

impl ProcessExecutor for FakeExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let role = request.role;
        self.requests
            .lock()
            .map_err(|_| CoreError::new(CoreErrorKind::Internal, "capture lock poisoned"))?
            .push(request);
        self.events
            .lock()
            .map_err(|_| CoreError::new(CoreErrorKind::Internal, "event lock poisoned"))?
            .push(Event::Spawned(role));

        let (status, already_exited) = match role {
            ProcessRole::SyncServer => (ProcessExitStatus::Signaled(15), self.sync_already_exited),
            ProcessRole::UiServer => (self.ui_status, None),
        };
        Ok(Box::new(FakeProcess {
            role,
            status,
            already_exited,
            events: self.events.clone(),
        }))
    }
}

async fn never() -> ShutdownSignal {
    std::future::pending().await
}

#[test]
fn request_validation_rejects_empty_program() {
    let request = ProcessSpawnRequest::new(ProcessRole::UiServer, CommandSpec::new(""));

    let error = request.validate().expect_err("expected validation failure");
    assert_eq!(error.kind, CoreErrorKind::InvalidInput);
    assert_eq!(error.role, Some(ProcessRole::UiServer));
}

#[test]
fn request_validation_rejects_zero_timeout() {
    let request = ProcessSpawnRequest::new(
        ProcessRole::SyncServer,
        CommandSpec::new("worksync").arg("serve"),
    )
    .timeout(Duration::ZERO);

    let error = request
        .validate()
        .expect_err("expected timeout validation failure");
    assert_eq!(error.kind, CoreErrorKind::InvalidInput);
    assert_eq!(error.role, Some(ProcessRole::SyncServer));
}

#[tokio::test]
async fn validated_spawn_passes_structured_command_through() {
    let executor = FakeExecutor::new(ProcessExitStatus::ExitCode(0));
    let request = ProcessSpawnRequest::new(
        ProcessRole::SyncServer,
        CommandSpec::new("python3")
            .args(["sync_server.py", "--port", "8502"])
            .env("PYTHONUNBUFFERED", "1")
            .working_dir(PathBuf::from("/srv/workflow")),
    );

    let handle = spawn_validated(&executor, request).expect("validated spawn should succeed");
    assert_eq!(handle.pid(), Some(4242));
    handle.wait().await.expect("wait should succeed");

    let captured = executor.requests().pop().expect("request captured");
    assert_eq!(captured.command.program, PathBuf::from("python3"));
    assert_eq!(captured.command.args, vec!["sync_server.py", "--port", "8502"]);
    assert_eq!(
        captured.command.env.get("PYTHONUNBUFFERED"),
        Some(&"1".to_string())
    );
    assert_eq!(
        captured.command.working_dir,
        Some(PathBuf::from("/srv/workflow"))
    );
}

#[tokio::test]
async fn supervisor_starts_sync_first_and_terminates_it_after_ui_exit() {
    let executor = FakeExecutor::new(ProcessExitStatus::ExitCode(2));
    let supervisor = Supervisor::new(Arc::new(executor.clone()));

    let report = supervisor
        .run(&LaunchConfig::default().plan(), never())
        .await
        .expect("run");

    assert_eq!(report.exit_code, 2);
    assert_eq!(
        executor.events(),
        vec![
            Event::Spawned(ProcessRole::SyncServer),
            Event::Spawned(ProcessRole::UiServer),
            Event::Terminated(ProcessRole::SyncServer, ProcessTerminationMode::Graceful),
        ]
    );

    let requests = executor.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].isolate_process_group);
    assert!(!requests[1].isolate_process_group);
    assert!(requests.iter().all(|request| request.stdio == StdioMode::Inherited));
}

#[tokio::test]
async fn supervisor_skips_termination_for_exited_sync_server() {
    let mut executor = FakeExecutor::new(ProcessExitStatus::ExitCode(0));
    executor.sync_already_exited = Some(ProcessExitStatus::ExitCode(1));
    let supervisor = Supervisor::new(Arc::new(executor.clone()));

    let report = supervisor
        .run(&LaunchConfig::default().plan(), never())
        .await
        .expect("run");

    assert_eq!(report.exit_code, 0);
    assert_eq!(
        report.sync_server,
        SyncServerShutdown::AlreadyExited(ProcessExitStatus::ExitCode(1))
    );
    assert!(
        !executor
            .events()
            .iter()
            .any(|event| matches!(event, Event::Terminated(..)))
    );
}
