//! HTTP server lifecycle
//!
//! Owns the listening socket and nothing else. `start` resolves once the
//! socket is bound; `stop` closes it and resolves once the serve task has
//! drained.

use crate::api::handlers::ApiState;
use crate::api::routes::create_router;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Server lifecycle errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Unable to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("Server task failed: {0}")]
    Join(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Server is not running")]
    NotRunning,
}

/// The gateway's HTTP listener
pub struct HttpServer {
    state: ApiState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), io::Error>>>,
    local_addr: Option<SocketAddr>,
}

impl HttpServer {
    pub fn new(state: ApiState) -> Self {
        Self {
            state,
            shutdown: None,
            handle: None,
            local_addr: None,
        }
    }

    /// The address the server is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind `host:port` and start serving. Resolves once listening.
    pub async fn start(&mut self, host: &str, port: u16) -> Result<SocketAddr, ServerError> {
        let addr = format!("{host}:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let app = create_router(self.state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        log::info!("Listening http on {local_addr}");
        self.shutdown = Some(shutdown_tx);
        self.handle = Some(handle);
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Close the listener and wait for the serve task to finish.
    pub async fn stop(&mut self) -> Result<(), ServerError> {
        let shutdown = self.shutdown.take().ok_or(ServerError::NotRunning)?;
        let handle = self.handle.take().ok_or(ServerError::NotRunning)?;

        // The serve task may already have exited on its own
        let _ = shutdown.send(());
        handle
            .await
            .map_err(|err| ServerError::Join(err.to_string()))??;

        log::info!("Closing http");
        self.local_addr = None;
        Ok(())
    }
}
