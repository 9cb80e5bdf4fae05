//! HTTP server hosting the dispatcher.
//!
//! This module accepts connections, reads and parses one request per
//! connection, hands it to the [`App`](crate::router::App) and writes the
//! response back.

mod response;
mod config;
mod error;
mod http_server;
mod tests;

// Re-export public items
pub use response::{HttpResponse, ResponseWriter, StatusCode};
pub use config::ServerConfig;
pub use error::Error;
pub use http_server::HttpServer;
