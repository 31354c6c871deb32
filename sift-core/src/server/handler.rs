use super::types::{ErrorKind, Request, Response};
use crate::engine::QueryEngine;
use tracing::debug;

/// Routes requests to the query engine.
pub struct RequestHandler {
    engine: QueryEngine,
}

impl RequestHandler {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }

    /// Handles a raw request line, answering malformed input with `bad_request`.
    pub async fn handle_line(&self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line.trim()) {
            Ok(request) => self.handle(request).await,
            Err(e) => Response::error(ErrorKind::BadRequest, format!("Malformed request: {}", e)),
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        debug!(?request, "Handling request");
        match request {
            Request::Query(query) => match self.engine.query(query).await {
                Ok(result) => Response::ok(&result),
                Err(e) => Response::from(&e),
            },
            Request::Metrics => Response::ok(&self.engine.metrics()),
            Request::InvalidateCache => {
                self.engine.invalidate_cache().await;
                Response::ack()
            }
            Request::Health => Response::ok(&self.engine.health().await),
        }
    }
}
