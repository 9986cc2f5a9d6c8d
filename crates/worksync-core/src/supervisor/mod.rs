//! Runs the sync server in the background and the UI server in the
//! foreground, and makes sure the sync server does not outlive the run.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::execution::{
    CommandSpec, ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput,
    ProcessSpawnRequest, ProcessTerminationMode, StdioMode, spawn_validated,
};
use crate::models::{CoreError, CoreErrorKind, ProcessRole};

mod guard;
pub mod signals;

pub use guard::SyncServerShutdown;
pub use signals::{ShutdownSignal, ShutdownSignals};

use guard::SyncServerGuard;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_SYNC_PORT: u16 = 8502;
pub const DEFAULT_UI_PORT: u16 = 8501;
pub const DEFAULT_DATABASE_PATH: &str = "workflow_system.db";
pub const DEFAULT_UI_PROGRAM: &str = "streamlit";
pub const DEFAULT_UI_APP: &str = "streamlit_app.py";
pub const DEFAULT_REAP_WINDOW: Duration = Duration::from_secs(2);

/// Exit code when the UI program does not exist, as a shell would report it.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code when the UI program exists but cannot be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchConfig {
    pub host: String,
    pub sync_port: u16,
    pub ui_port: u16,
    pub database_path: PathBuf,
    /// Program and leading arguments that start the sync server; the bind
    /// address, port and database flags are appended.
    pub sync_command: CommandSpec,
    pub ui_program: PathBuf,
    pub ui_app: PathBuf,
    /// How long cleanup waits for the sync server to exit after SIGTERM.
    pub reap_window: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            sync_port: DEFAULT_SYNC_PORT,
            ui_port: DEFAULT_UI_PORT,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            sync_command: CommandSpec::new("worksync").arg("serve"),
            ui_program: PathBuf::from(DEFAULT_UI_PROGRAM),
            ui_app: PathBuf::from(DEFAULT_UI_APP),
            reap_window: DEFAULT_REAP_WINDOW,
        }
    }
}

impl LaunchConfig {
    pub fn plan(&self) -> LaunchPlan {
        let sync_server = self.sync_command.clone().args([
            "--host".to_string(),
            self.host.clone(),
            "--port".to_string(),
            self.sync_port.to_string(),
            "--db".to_string(),
            self.database_path.display().to_string(),
        ]);

        let ui_server = CommandSpec::new(&self.ui_program).args([
            "run".to_string(),
            self.ui_app.display().to_string(),
            "--server.headless".to_string(),
            "true".to_string(),
            "--server.port".to_string(),
            self.ui_port.to_string(),
        ]);

        LaunchPlan {
            sync_server,
            ui_server,
            reap_window: self.reap_window,
        }
    }
}

/// The two fully resolved commands a supervisor run starts, in start order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchPlan {
    pub sync_server: CommandSpec,
    pub ui_server: CommandSpec,
    pub reap_window: Duration,
}

impl LaunchPlan {
    pub fn validate(&self) -> ExecutionResult<()> {
        self.sync_server.validate(ProcessRole::SyncServer)?;
        self.ui_server.validate(ProcessRole::UiServer)
    }

    fn sync_request(&self) -> ProcessSpawnRequest {
        ProcessSpawnRequest::new(ProcessRole::SyncServer, self.sync_server.clone())
            .stdio(StdioMode::Inherited)
            .isolate_process_group(true)
    }

    fn ui_request(&self) -> ProcessSpawnRequest {
        // The UI stays in our process group so terminal Ctrl-C reaches it directly.
        ProcessSpawnRequest::new(ProcessRole::UiServer, self.ui_server.clone())
            .stdio(StdioMode::Inherited)
            .isolate_process_group(false)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SupervisorReport {
    /// The code the supervisor should exit with.
    pub exit_code: i32,
    /// `None` when the UI server could not be spawned or waited on.
    pub ui_status: Option<ProcessExitStatus>,
    pub sync_server: SyncServerShutdown,
    pub shutdown: Option<ShutdownSignal>,
}

pub struct Supervisor {
    executor: Arc<dyn ProcessExecutor>,
}

enum ForegroundEvent {
    UiExited(ExecutionResult<ProcessOutput>),
    Shutdown(ShutdownSignal),
}

impl Supervisor {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self { executor }
    }

    /// Runs one supervised session. Returns an error only when the plan is
    /// invalid, in which case nothing has been spawned.
    pub async fn run<F>(&self, plan: &LaunchPlan, shutdown: F) -> ExecutionResult<SupervisorReport>
    where
        F: Future<Output = ShutdownSignal>,
    {
        plan.validate()?;

        let sync_process = match spawn_validated(self.executor.as_ref(), plan.sync_request()) {
            Ok(process) => {
                tracing::info!(
                    role = ?ProcessRole::SyncServer,
                    pid = process.pid(),
                    command = %plan.sync_server.display(),
                    "started sync server"
                );
                Some(process)
            }
            Err(error) => {
                // No health check: the UI still starts without a sync server.
                tracing::warn!(
                    role = ?ProcessRole::SyncServer,
                    kind = ?error.kind,
                    message = %error.message,
                    "sync server failed to start; continuing"
                );
                None
            }
        };
        let guard = SyncServerGuard::new(sync_process, plan.reap_window);

        let ui = match spawn_validated(self.executor.as_ref(), plan.ui_request()) {
            Ok(process) => process,
            Err(error) => {
                tracing::error!(
                    role = ?ProcessRole::UiServer,
                    kind = ?error.kind,
                    message = %error.message,
                    "UI server failed to start"
                );
                let sync_server = guard.shutdown().await;
                return Ok(SupervisorReport {
                    exit_code: spawn_failure_exit_code(&error),
                    ui_status: None,
                    sync_server,
                    shutdown: None,
                });
            }
        };
        tracing::info!(
            role = ?ProcessRole::UiServer,
            pid = ui.pid(),
            command = %plan.ui_server.display(),
            "started UI server"
        );

        let ui_signaller = ui.signaller();
        let mut ui_wait = ui.wait();
        tokio::pin!(shutdown);

        let event = tokio::select! {
            result = &mut ui_wait => ForegroundEvent::UiExited(result),
            signal = &mut shutdown => ForegroundEvent::Shutdown(signal),
        };

        let (ui_result, received) = match event {
            ForegroundEvent::UiExited(result) => (result, None),
            ForegroundEvent::Shutdown(signal) => {
                tracing::info!(signal = ?signal, "shutdown requested; stopping UI server");
                if let Err(error) = ui_signaller.terminate(ProcessTerminationMode::Graceful) {
                    tracing::warn!(
                        role = ?ProcessRole::UiServer,
                        kind = ?error.kind,
                        message = %error.message,
                        "failed to signal UI server"
                    );
                }
                (ui_wait.await, Some(signal))
            }
        };

        let ui_status = match ui_result {
            Ok(output) => {
                tracing::info!(
                    role = ?ProcessRole::UiServer,
                    status = ?output.status,
                    "UI server exited"
                );
                Some(output.status)
            }
            Err(error) => {
                tracing::error!(
                    role = ?ProcessRole::UiServer,
                    kind = ?error.kind,
                    message = %error.message,
                    "failed to wait for UI server"
                );
                None
            }
        };

        let sync_server = guard.shutdown().await;

        let exit_code = match (received, ui_status) {
            (Some(signal), _) => signal.exit_code(),
            (None, Some(status)) => status.shell_exit_code(),
            (None, None) => 1,
        };

        Ok(SupervisorReport {
            exit_code,
            ui_status,
            sync_server,
            shutdown: received,
        })
    }
}

fn spawn_failure_exit_code(error: &CoreError) -> i32 {
    match error.kind {
        CoreErrorKind::NotInstalled => EXIT_NOT_FOUND,
        CoreErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
        _ => 1,
    }
}
