use tokio::signal::unix::{Signal, SignalKind, signal};

use crate::execution::ExecutionResult;
use crate::models::{CoreError, CoreErrorKind};

/// A request from outside for the supervisor to stop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl ShutdownSignal {
    pub fn signal_number(self) -> i32 {
        match self {
            ShutdownSignal::Interrupt => libc::SIGINT,
            ShutdownSignal::Terminate => libc::SIGTERM,
        }
    }

    /// Exit code a shell reports for a job that died from this signal.
    pub fn exit_code(self) -> i32 {
        128 + self.signal_number()
    }
}

/// SIGINT/SIGTERM listeners. Installing them replaces the default
/// "terminate immediately" disposition, so create this before spawning
/// anything that needs cleanup.
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    pub fn install() -> ExecutionResult<Self> {
        let interrupt = signal(SignalKind::interrupt()).map_err(install_failure)?;
        let terminate = signal(SignalKind::terminate()).map_err(install_failure)?;
        Ok(Self {
            interrupt,
            terminate,
        })
    }

    pub async fn recv(&mut self) -> ShutdownSignal {
        tokio::select! {
            _ = self.interrupt.recv() => ShutdownSignal::Interrupt,
            _ = self.terminate.recv() => ShutdownSignal::Terminate,
        }
    }
}

fn install_failure(error: std::io::Error) -> CoreError {
    CoreError::new(
        CoreErrorKind::Internal,
        format!("failed to install signal handlers: {error}"),
    )
}
