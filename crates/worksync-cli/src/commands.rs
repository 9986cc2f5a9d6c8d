use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use worksync_core::execution::TokioProcessExecutor;
use worksync_core::models::UserState;
use worksync_core::persistence::UserStateStore;
use worksync_core::sqlite::SqliteStore;
use worksync_core::supervisor::{ShutdownSignals, Supervisor, SyncServerShutdown};
use worksync_server::SyncServer;

use crate::error::CliError;
use crate::parser::{Command, DumpArgs, LaunchArgs, ServeArgs};

/// Runs a command and returns the process exit code.
pub async fn run(command: Command) -> Result<i32, CliError> {
    match command {
        Command::Launch(args) => launch(args).await,
        Command::Serve(args) => serve(args).await,
        Command::Dump(args) => {
            let output = tokio::task::spawn_blocking(move || dump(&args)).await??;
            println!("{output}");
            Ok(0)
        }
    }
}

async fn launch(args: LaunchArgs) -> Result<i32, CliError> {
    let self_exe = std::env::current_exe()?;
    let plan = args.launch_config(&self_exe).plan();

    // Installed before anything is spawned so an early Ctrl-C still runs cleanup.
    let mut signals = ShutdownSignals::install()?;
    let supervisor = Supervisor::new(Arc::new(TokioProcessExecutor));
    let report = supervisor
        .run(&plan, async move { signals.recv().await })
        .await?;

    if report.sync_server == SyncServerShutdown::Unconfirmed {
        tracing::warn!("sync server may still be running");
    }
    Ok(report.exit_code)
}

async fn serve(args: ServeArgs) -> Result<i32, CliError> {
    let mut signals = ShutdownSignals::install()?;
    let server = SyncServer::bind(args.server_config()).await?;
    server
        .serve(async move {
            let signal = signals.recv().await;
            tracing::info!(signal = ?signal, "shutting down sync server");
        })
        .await?;
    Ok(0)
}

#[derive(Debug, Serialize)]
struct DumpRow<'a> {
    username: &'a str,
    last_updated: Option<&'a str>,
    /// Parsed state, or the raw text when the row does not hold valid JSON.
    state: Value,
}

impl<'a> From<&'a UserState> for DumpRow<'a> {
    fn from(row: &'a UserState) -> Self {
        Self {
            username: &row.username,
            last_updated: row.last_updated.as_deref(),
            state: row
                .state_value()
                .unwrap_or_else(|| Value::String(row.state_json.clone())),
        }
    }
}

/// Renders what the admin console would see for one user or for everyone.
pub fn dump(args: &DumpArgs) -> Result<String, CliError> {
    let store = open_store(&args.database_path)?;

    let rendered = match &args.username {
        Some(username) => {
            let row = store
                .user_state(username)?
                .ok_or_else(|| CliError::UserNotFound(username.clone()))?;
            serde_json::to_string_pretty(&DumpRow::from(&row))?
        }
        None => {
            let rows = store.list_user_states()?;
            let view: Vec<DumpRow<'_>> = rows.iter().map(DumpRow::from).collect();
            serde_json::to_string_pretty(&view)?
        }
    };
    Ok(rendered)
}

fn open_store(database_path: &Path) -> Result<SqliteStore, CliError> {
    // Opening would create the file.
    if !database_path.exists() {
        return Err(CliError::DatabaseMissing(database_path.to_path_buf()));
    }
    let store = SqliteStore::new(database_path);
    // Databases created by the UI alone have the tables but no migration record.
    store.migrate_to_latest()?;
    Ok(store)
}
