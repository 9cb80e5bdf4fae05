//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The size of each read from the socket.
    pub read_buffer_size: usize,
    /// The largest request (headers and body) accepted before answering 413.
    pub max_request_size: usize,
    /// Deadline for receiving a complete request. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Deadline for writing the response. `None` waits forever.
    pub write_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Default configuration bound to `addr`.
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1024,
            read_buffer_size: 8192,
            max_request_size: 1024 * 1024,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
