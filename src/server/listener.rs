//! Relay server listener
//!
//! Binds the HTTP transport and wires it to the session controller.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::probe::{ProbeTool, SoxTool};
use crate::session::SessionController;

use super::http::{create_router, AppState};

/// Relay server
pub struct RelayServer<T: ProbeTool = SoxTool> {
    bind_addr: SocketAddr,
    state: AppState<T>,
}

impl RelayServer<SoxTool> {
    /// Create a new server with the given configuration
    pub fn new(config: RelayConfig) -> Self {
        Self::with_controller(Arc::new(SessionController::with_config(config)))
    }
}

impl<T: ProbeTool> RelayServer<T> {
    /// Create a server around an existing controller
    pub fn with_controller(controller: Arc<SessionController<T>>) -> Self {
        Self {
            bind_addr: controller.config().bind_addr,
            state: AppState::new(controller),
        }
    }

    /// Get the session controller
    pub fn controller(&self) -> &Arc<SessionController<T>> {
        &self.state.controller
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| Error::Http(format!("failed to bind {}: {}", self.bind_addr, e)))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// On shutdown the broadcast is stopped and every listener stream is
    /// ended so open `/stream` responses complete.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Relay server listening");

        let controller = Arc::clone(&self.state.controller);
        let signal = async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");

            controller.stop().await;
            controller.registry().clear().await;
        };

        axum::serve(listener, create_router(self.state.clone()))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        tracing::info!("Relay server stopped");
        Ok(())
    }
}
