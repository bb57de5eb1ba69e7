/// Transport abstraction the executor dispatches through.
use std::sync::Arc;

use crate::error::{HandlerError, TransportError};

/// What a transport hands back for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Executes one request at a time. Shared across every dispatch task, so
/// implementations must tolerate concurrent calls.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    type Request: Send + 'static;

    async fn send(&self, request: Self::Request) -> Result<Response, TransportError>;
}

/// Accepts or rejects a response. A rejection is recorded like a transport failure.
pub type ResponseHandler = Arc<dyn Fn(&Response) -> Result<(), HandlerError> + Send + Sync>;
