use std::os::unix::process::ExitStatusExt;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tokio::io::AsyncReadExt;

use crate::execution::{
    ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSignaller,
    ProcessSpawnRequest, ProcessTerminationMode, ProcessWaitFuture, RunningProcess, StdioMode,
};
use crate::models::{CoreError, CoreErrorKind, ProcessRole};

pub struct TokioProcessExecutor;

impl ProcessExecutor for TokioProcessExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let mut cmd = tokio::process::Command::new(&request.command.program);
        cmd.args(&request.command.args);

        for (key, value) in &request.command.env {
            cmd.env(key, value);
        }

        if let Some(dir) = &request.command.working_dir {
            cmd.current_dir(dir);
        }

        match request.stdio {
            StdioMode::Captured => {
                cmd.stdin(std::process::Stdio::null());
                cmd.stdout(std::process::Stdio::piped());
                cmd.stderr(std::process::Stdio::piped());
            }
            StdioMode::Inherited => {
                cmd.stdin(std::process::Stdio::inherit());
                cmd.stdout(std::process::Stdio::inherit());
                cmd.stderr(std::process::Stdio::inherit());
            }
        }

        if request.isolate_process_group {
            cmd.process_group(0);
        }

        let child = cmd
            .spawn()
            .map_err(|error| spawn_failure(request.role, &request.command.program, error))?;

        let pid = child.id();
        let started_at = SystemTime::now();

        Ok(Box::new(TokioRunningProcess {
            child: Mutex::new(Some(child)),
            signaller: ProcessSignaller {
                role: request.role,
                pid,
                process_group: request.isolate_process_group,
            },
            started_at,
            timeout: request.timeout,
        }))
    }
}

struct TokioRunningProcess {
    child: Mutex<Option<tokio::process::Child>>,
    signaller: ProcessSignaller,
    started_at: SystemTime,
    timeout: Option<Duration>,
}

impl RunningProcess for TokioRunningProcess {
    fn pid(&self) -> Option<u32> {
        self.signaller.pid
    }

    fn signaller(&self) -> ProcessSignaller {
        self.signaller.clone()
    }

    fn try_status(&self) -> ExecutionResult<Option<ProcessExitStatus>> {
        let role = self.signaller.role;
        let mut guard = self.child.lock().map_err(|_| {
            process_failure(role, "child process handle lock poisoned".to_string())
        })?;
        let Some(child) = guard.as_mut() else {
            return Err(process_failure(
                role,
                "child process already consumed".to_string(),
            ));
        };

        let status = child.try_wait().map_err(|error| {
            process_failure(role, format!("failed to poll process status: {error}"))
        })?;
        Ok(status.map(exit_status))
    }

    fn wait(self: Box<Self>) -> ProcessWaitFuture {
        let child = self.child.into_inner().ok().flatten();
        let timeout = self.timeout;
        let started_at = self.started_at;
        let signaller = self.signaller;

        Box::pin(async move {
            let role = signaller.role;
            let mut child = child.ok_or_else(|| {
                process_failure(role, "child process already consumed".to_string())
            })?;

            let stdout_reader = {
                let mut stdout = child.stdout.take();
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    if let Some(mut handle) = stdout.take() {
                        let _ = handle.read_to_end(&mut buffer).await;
                    }
                    buffer
                })
            };
            let stderr_reader = {
                let mut stderr = child.stderr.take();
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    if let Some(mut handle) = stderr.take() {
                        let _ = handle.read_to_end(&mut buffer).await;
                    }
                    buffer
                })
            };

            let wait_err = |error: std::io::Error| {
                process_failure(role, format!("failed to wait for process: {error}"))
            };

            // Wait for process exit first, then collect output with a short bounded read window.
            // Descendants that inherited the pipes would otherwise keep the readers open.
            let status = if let Some(timeout_duration) = timeout {
                match tokio::time::timeout(timeout_duration, child.wait()).await {
                    Ok(result) => result.map_err(wait_err)?,
                    Err(_) => {
                        let _ = signaller.terminate(ProcessTerminationMode::Immediate);
                        let _ = tokio::time::timeout(Duration::from_secs(1), child.wait()).await;
                        stdout_reader.abort();
                        stderr_reader.abort();
                        return Err(CoreError::for_role(
                            role,
                            CoreErrorKind::Timeout,
                            format!(
                                "process timed out after {}ms",
                                timeout_duration.as_millis()
                            ),
                        ));
                    }
                }
            } else {
                child.wait().await.map_err(wait_err)?
            };

            let read_deadline = Duration::from_millis(250);
            let stdout = match tokio::time::timeout(read_deadline, stdout_reader).await {
                Ok(Ok(buffer)) => buffer,
                _ => Vec::new(),
            };
            let stderr = match tokio::time::timeout(read_deadline, stderr_reader).await {
                Ok(Ok(buffer)) => buffer,
                _ => Vec::new(),
            };

            Ok(ProcessOutput {
                status: exit_status(status),
                stdout,
                stderr,
                started_at,
                finished_at: SystemTime::now(),
            })
        })
    }
}

fn exit_status(status: std::process::ExitStatus) -> ProcessExitStatus {
    match (status.code(), status.signal()) {
        (Some(code), _) => ProcessExitStatus::ExitCode(code),
        (None, Some(signal)) => ProcessExitStatus::Signaled(signal),
        // Neither an exit code nor a signal: report it the way a shell reports an unknown failure.
        (None, None) => ProcessExitStatus::ExitCode(1),
    }
}

fn spawn_failure(role: ProcessRole, program: &std::path::Path, error: std::io::Error) -> CoreError {
    let kind = match error.kind() {
        std::io::ErrorKind::NotFound => CoreErrorKind::NotInstalled,
        std::io::ErrorKind::PermissionDenied => CoreErrorKind::PermissionDenied,
        _ => CoreErrorKind::ProcessFailure,
    };
    CoreError::for_role(
        role,
        kind,
        format!("failed to spawn '{}': {error}", program.display()),
    )
}

fn process_failure(role: ProcessRole, message: String) -> CoreError {
    CoreError::for_role(role, CoreErrorKind::ProcessFailure, message)
}
