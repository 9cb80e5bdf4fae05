//! Error types for the HTTP server and dispatcher.

use thiserror::Error;

use crate::parser::{Error as ParserError, Method};

/// Errors that can occur while serving and dispatching requests.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Method not served by any route table.
    #[error("Method {0} not allowed for path: {1}")]
    MethodNotAllowed(Method, String),

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// The request exceeded the configured size limit.
    #[error("Request larger than {0} bytes")]
    PayloadTooLarge(usize),

    /// A read or write deadline elapsed.
    #[error("Timed out while {0}")]
    Timeout(&'static str),

    /// A static root had no file or asset for the path.
    #[error("Static asset not found: {0}")]
    StaticAssetNotFound(String),

    /// The request carried no body to decode.
    #[error("empty body")]
    EmptyBody,

    /// The request body could not be decoded.
    #[error("Failed to decode request body: {0}")]
    DecodeError(#[source] serde_json::Error),

    /// A response value could not be serialized.
    #[error("Failed to serialize response: {0}")]
    SerializeFailure(#[source] serde_json::Error),

    /// A template could not be rendered.
    #[error("Failed to render template: {0}")]
    RenderFailure(String),
}
