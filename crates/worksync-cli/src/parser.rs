//! Command-line definition. Every flag falls back to a `WORKSYNC_*`
//! environment variable, then to the fixed defaults of the original launcher.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use worksync_core::execution::CommandSpec;
use worksync_core::supervisor::{
    DEFAULT_DATABASE_PATH, DEFAULT_HOST, DEFAULT_SYNC_PORT, DEFAULT_UI_APP, DEFAULT_UI_PORT,
    DEFAULT_UI_PROGRAM, LaunchConfig,
};
use worksync_server::ServerConfig;

/// Runs the workflow sync server alongside the web UI.
///
/// With no subcommand this behaves like `worksync launch`.
#[derive(Debug, Parser)]
#[command(name = "worksync")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub launch: LaunchArgs,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Launch(self.launch))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the sync server in the background and the UI in the foreground
    Launch(LaunchArgs),
    /// Run the sync server in this process
    Serve(ServeArgs),
    /// Print stored workflow state as JSON
    Dump(DumpArgs),
}

#[derive(Debug, Clone, Args)]
pub struct LaunchArgs {
    /// Address the sync server binds to
    #[arg(long, env = "WORKSYNC_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "WORKSYNC_SYNC_PORT", default_value_t = DEFAULT_SYNC_PORT)]
    pub sync_port: u16,

    #[arg(long, env = "WORKSYNC_UI_PORT", default_value_t = DEFAULT_UI_PORT)]
    pub ui_port: u16,

    /// SQLite database shared by the sync server and the UI
    #[arg(long = "db", env = "WORKSYNC_DB", default_value = DEFAULT_DATABASE_PATH)]
    pub database_path: PathBuf,

    /// External sync server program; defaults to `<this executable> serve`
    #[arg(long, env = "WORKSYNC_SYNC_PROGRAM")]
    pub sync_program: Option<PathBuf>,

    /// Script passed as the first argument to --sync-program
    #[arg(long, env = "WORKSYNC_SYNC_SCRIPT", requires = "sync_program")]
    pub sync_script: Option<PathBuf>,

    #[arg(long, env = "WORKSYNC_UI_PROGRAM", default_value = DEFAULT_UI_PROGRAM)]
    pub ui_program: PathBuf,

    /// App file handed to `<ui-program> run`
    #[arg(long, env = "WORKSYNC_UI_APP", default_value = DEFAULT_UI_APP)]
    pub ui_app: PathBuf,

    /// How long to wait for the sync server to exit after SIGTERM
    #[arg(long, env = "WORKSYNC_REAP_WINDOW_MS", default_value_t = 2000)]
    pub reap_window_ms: u64,
}

impl LaunchArgs {
    pub fn launch_config(&self, self_exe: &Path) -> LaunchConfig {
        let sync_command = match (&self.sync_program, &self.sync_script) {
            (Some(program), Some(script)) => {
                CommandSpec::new(program).arg(script.display().to_string())
            }
            (Some(program), None) => CommandSpec::new(program),
            (None, _) => CommandSpec::new(self_exe).arg("serve"),
        };

        LaunchConfig {
            host: self.host.clone(),
            sync_port: self.sync_port,
            ui_port: self.ui_port,
            database_path: self.database_path.clone(),
            sync_command,
            ui_program: self.ui_program.clone(),
            ui_app: self.ui_app.clone(),
            reap_window: Duration::from_millis(self.reap_window_ms),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "WORKSYNC_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "WORKSYNC_SYNC_PORT", default_value_t = DEFAULT_SYNC_PORT)]
    pub port: u16,

    #[arg(long = "db", env = "WORKSYNC_DB", default_value = DEFAULT_DATABASE_PATH)]
    pub database_path: PathBuf,
}

impl ServeArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            database_path: self.database_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct DumpArgs {
    #[arg(long = "db", env = "WORKSYNC_DB", default_value = DEFAULT_DATABASE_PATH)]
    pub database_path: PathBuf,

    /// Only print this user's state
    #[arg(long = "user")]
    pub username: Option<String>,
}
