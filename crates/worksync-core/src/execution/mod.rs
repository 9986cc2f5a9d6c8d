use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, SystemTime};

use crate::models::{CoreError, CoreErrorKind, ProcessRole};

pub mod tokio_process;

pub use tokio_process::TokioProcessExecutor;

pub type ExecutionResult<T> = Result<T, CoreError>;

pub type ProcessWaitFuture = Pin<Box<dyn Future<Output = ExecutionResult<ProcessOutput>> + Send>>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Renders the command the way a shell user would type it, for logs.
    pub fn display(&self) -> String {
        let mut rendered = self.program.display().to_string();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }

    pub fn validate(&self, role: ProcessRole) -> ExecutionResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(invalid_input(role, "command program path must not be empty"));
        }

        if self
            .args
            .iter()
            .any(|arg| arg.is_empty() || arg.contains('\0'))
        {
            return Err(invalid_input(
                role,
                "command args must be non-empty and must not contain NUL bytes",
            ));
        }

        if self
            .env
            .iter()
            .any(|(key, value)| key.is_empty() || key.contains('\0') || value.contains('\0'))
        {
            return Err(invalid_input(
                role,
                "environment keys must be non-empty; keys and values must not contain NUL bytes",
            ));
        }

        Ok(())
    }
}

/// How the child's standard streams are wired.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StdioMode {
    /// stdin is null, stdout/stderr are piped and returned in [`ProcessOutput`].
    Captured,
    /// The child shares the supervisor's terminal.
    Inherited,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessSpawnRequest {
    pub role: ProcessRole,
    pub command: CommandSpec,
    pub stdio: StdioMode,
    /// Places the child in a new process group so termination reaches its
    /// descendants and terminal job-control signals do not.
    pub isolate_process_group: bool,
    pub timeout: Option<Duration>,
    pub requested_at: SystemTime,
}

impl ProcessSpawnRequest {
    pub fn new(role: ProcessRole, command: CommandSpec) -> Self {
        Self {
            role,
            command,
            stdio: StdioMode::Captured,
            isolate_process_group: true,
            timeout: None,
            requested_at: SystemTime::now(),
        }
    }

    pub fn stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = stdio;
        self
    }

    pub fn isolate_process_group(mut self, isolate: bool) -> Self {
        self.isolate_process_group = isolate;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> ExecutionResult<()> {
        self.command.validate(self.role)?;

        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err(invalid_input(
                self.role,
                "timeout must be greater than zero when provided",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessTerminationMode {
    Graceful,
    Immediate,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessExitStatus {
    ExitCode(i32),
    Signaled(i32),
}

impl ProcessExitStatus {
    pub fn success(self) -> bool {
        self == ProcessExitStatus::ExitCode(0)
    }

    /// Exit code as a POSIX shell reports it: signal deaths become `128 + signal`.
    pub fn shell_exit_code(self) -> i32 {
        match self {
            ProcessExitStatus::ExitCode(code) => code,
            ProcessExitStatus::Signaled(signal) => 128 + signal,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessOutput {
    pub status: ProcessExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

/// Sends signals to a spawned process after its [`RunningProcess`] handle
/// has been handed to `wait`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessSignaller {
    pub role: ProcessRole,
    pub pid: Option<u32>,
    pub process_group: bool,
}

impl ProcessSignaller {
    /// Sends the termination signal. A process that is already gone is not
    /// an error.
    pub fn terminate(&self, mode: ProcessTerminationMode) -> ExecutionResult<()> {
        let Some(pid) = self.pid else {
            return Ok(());
        };

        let signal = match mode {
            ProcessTerminationMode::Immediate => libc::SIGKILL,
            ProcessTerminationMode::Graceful => libc::SIGTERM,
        };

        let target = if self.process_group {
            -(pid as libc::pid_t)
        } else {
            pid as libc::pid_t
        };
        let result = unsafe { libc::kill(target, signal) };

        if result != 0 {
            let os_error = std::io::Error::last_os_error();
            if os_error.raw_os_error() != Some(libc::ESRCH) {
                let scope = if self.process_group {
                    "process group"
                } else {
                    "process"
                };
                return Err(CoreError::for_role(
                    self.role,
                    CoreErrorKind::ProcessFailure,
                    format!("failed to send signal {signal} to {scope} {pid}: {os_error}"),
                ));
            }
        }

        Ok(())
    }
}

pub trait RunningProcess: Send + Sync {
    fn pid(&self) -> Option<u32>;

    fn signaller(&self) -> ProcessSignaller;

    fn terminate(&self, mode: ProcessTerminationMode) -> ExecutionResult<()> {
        self.signaller().terminate(mode)
    }

    /// Returns the exit status if the process has already exited, without blocking.
    fn try_status(&self) -> ExecutionResult<Option<ProcessExitStatus>>;

    fn wait(self: Box<Self>) -> ProcessWaitFuture;
}

pub trait ProcessExecutor: Send + Sync {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>>;
}

pub fn spawn_validated(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> ExecutionResult<Box<dyn RunningProcess>> {
    request.validate()?;
    executor.spawn(request)
}

fn invalid_input(role: ProcessRole, message: &str) -> CoreError {
    CoreError::for_role(role, CoreErrorKind::InvalidInput, message)
}
