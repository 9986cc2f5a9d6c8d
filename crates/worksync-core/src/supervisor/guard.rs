use std::time::Duration;

use crate::execution::{ProcessExitStatus, ProcessTerminationMode, RunningProcess};
use crate::models::ProcessRole;

/// What happened to the sync server when the supervisor cleaned up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncServerShutdown {
    /// Spawning failed, so there was nothing to clean up.
    NotStarted,
    /// It had exited on its own before cleanup ran.
    AlreadyExited(ProcessExitStatus),
    /// It was sent SIGTERM and exited within the reap window.
    Terminated(ProcessExitStatus),
    /// It was sent SIGTERM but its exit could not be confirmed in time.
    Unconfirmed,
}

/// Owns the background sync server for the lifetime of a supervisor run.
///
/// `shutdown` is the orderly path. If the guard is dropped without it
/// (early return, panic, cancelled future) the process group still gets
/// SIGTERM.
pub(crate) struct SyncServerGuard {
    process: Option<Box<dyn RunningProcess>>,
    reap_window: Duration,
}

impl SyncServerGuard {
    pub(crate) fn new(process: Option<Box<dyn RunningProcess>>, reap_window: Duration) -> Self {
        Self {
            process,
            reap_window,
        }
    }

    pub(crate) async fn shutdown(mut self) -> SyncServerShutdown {
        let Some(process) = self.process.take() else {
            return SyncServerShutdown::NotStarted;
        };
        let pid = process.pid();

        match process.try_status() {
            Ok(Some(status)) => {
                tracing::info!(
                    role = ?ProcessRole::SyncServer,
                    pid,
                    status = ?status,
                    "sync server had already exited"
                );
                return SyncServerShutdown::AlreadyExited(status);
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(
                    role = ?ProcessRole::SyncServer,
                    pid,
                    kind = ?error.kind,
                    message = %error.message,
                    "failed to poll sync server status before cleanup"
                );
            }
        }

        if let Err(error) = process.terminate(ProcessTerminationMode::Graceful) {
            tracing::warn!(
                role = ?ProcessRole::SyncServer,
                pid,
                kind = ?error.kind,
                message = %error.message,
                "failed to signal sync server"
            );
        }

        match tokio::time::timeout(self.reap_window, process.wait()).await {
            Ok(Ok(output)) => {
                tracing::info!(
                    role = ?ProcessRole::SyncServer,
                    pid,
                    status = ?output.status,
                    "sync server stopped"
                );
                SyncServerShutdown::Terminated(output.status)
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    role = ?ProcessRole::SyncServer,
                    pid,
                    kind = ?error.kind,
                    message = %error.message,
                    "failed to wait for sync server"
                );
                SyncServerShutdown::Unconfirmed
            }
            Err(_) => {
                tracing::warn!(
                    role = ?ProcessRole::SyncServer,
                    pid,
                    reap_window = ?self.reap_window,
                    "sync server still running after SIGTERM; leaving it"
                );
                SyncServerShutdown::Unconfirmed
            }
        }
    }
}

impl Drop for SyncServerGuard {
    fn drop(&mut self) {
        if let Some(process) = self.process.take() {
            let _ = process.terminate(ProcessTerminationMode::Graceful);
        }
    }
}
