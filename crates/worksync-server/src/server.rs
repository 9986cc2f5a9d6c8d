use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use worksync_core::sqlite::SqliteStore;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::routes::router;
use crate::state::AppState;

pub struct SyncServer {
    config: ServerConfig,
    listener: TcpListener,
    store: Arc<SqliteStore>,
}

impl SyncServer {
    /// Prepares the database schema and binds the listening socket.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let store = Arc::new(SqliteStore::new(&config.database_path));
        let migrating = store.clone();
        tokio::task::spawn_blocking(move || migrating.migrate_to_latest()).await??;

        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })?;

        Ok(Self {
            config,
            listener,
            store,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = self.local_addr()?;
        tracing::info!(
            "listening on http://{}:{} (db={})",
            self.config.host,
            local_addr.port(),
            self.config.database_path.display()
        );

        let app = router(AppState::new(self.store));
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("sync server stopped");
        Ok(())
    }
}
