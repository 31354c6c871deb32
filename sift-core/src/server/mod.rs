//! Unix socket server exposing the query engine.
//!
//! The server is organized into separate concerns:
//! - `types`: Protocol types for requests and responses
//! - `handler`: Routing requests to the engine
//! - `transport`: Unix socket communication layer
//!
//! Each connection carries one JSON request line and receives one JSON
//! response line.

mod handler;
mod transport;
mod types;

pub use handler::RequestHandler;
pub use transport::{send_request, TransportError, UnixSocketTransport};
pub use types::{ErrorKind, Request, Response};

use crate::engine::QueryEngine;
use std::sync::Arc;
use tokio::net::UnixStream;
use tokio::signal;
use tracing::{info, warn};

/// Accept loop coordinating transport and request handling.
pub struct Server {
    handler: Arc<RequestHandler>,
    transport: UnixSocketTransport,
}

impl Server {
    pub fn new(engine: QueryEngine, socket_path: impl Into<String>) -> Self {
        Self {
            handler: Arc::new(RequestHandler::new(engine)),
            transport: UnixSocketTransport::new(socket_path),
        }
    }

    /// Listens until Ctrl-C, then removes the socket file.
    pub async fn start(&self) -> Result<(), TransportError> {
        let listener = self.transport.bind().await?;
        info!(socket = self.transport.socket_path(), "Server listening");

        let shutdown = signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let handler = Arc::clone(&self.handler);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, handler).await {
                                warn!(error = %e, "Connection error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                },
                _ = &mut shutdown => {
                    info!("Shutting down");
                    self.transport.cleanup();
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    handler: Arc<RequestHandler>,
) -> Result<(), TransportError> {
    let line = transport::read_line(&mut stream).await?;
    let response = handler.handle_line(&line).await;
    transport::write_response(&mut stream, &response).await
}
