//! HTTP endpoint that receives workflow state pushed by employee pages and
//! persists it into the shared SQLite database for the admin view.

pub mod config;
pub mod error;
mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, SyncError};
pub use routes::router;
pub use server::SyncServer;
pub use state::AppState;
