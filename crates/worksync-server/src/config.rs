use std::path::PathBuf;

use worksync_core::supervisor::{DEFAULT_DATABASE_PATH, DEFAULT_HOST, DEFAULT_SYNC_PORT};

/// Bind address and database location for the sync server.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    /// Port 0 asks the OS for a free port.
    pub port: u16,
    pub database_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_SYNC_PORT,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
