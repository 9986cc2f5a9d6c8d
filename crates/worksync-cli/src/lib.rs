pub mod commands;
pub mod error;
pub mod logging;
pub mod parser;

pub use error::CliError;
pub use parser::{Cli, Command, DumpArgs, LaunchArgs, ServeArgs};
