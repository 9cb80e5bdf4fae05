//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::parser::{expected_length, parse_request, Method, MethodClass};
use crate::router::App;
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};

/// An HTTP server hosting an [`App`].
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The application every request is dispatched to.
    pub app: Arc<App>,
}

/// Run `fut` under an optional deadline.
async fn with_deadline<T, F>(deadline: Option<Duration>, what: &'static str, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(what))?,
        None => fut.await,
    }
}

fn plain_response(status: StatusCode, body: impl Into<String>) -> HttpResponse {
    HttpResponse::new(status)
        .with_content_type("text/plain")
        .with_header("Connection", "close")
        .with_body_string(body)
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and application.
    ///
    /// The application is frozen from here on: routes and middleware must be
    /// registered before the server is created.
    pub fn new(config: ServerConfig, app: App) -> Self {
        Self {
            config,
            app: Arc::new(app),
        }
    }

    /// Log the registered endpoints and fallbacks.
    fn display_server_info(&self) {
        info!("Registered endpoints:");
        for (method, class) in [("GET", MethodClass::Read), ("POST", MethodClass::Write)] {
            for pattern in self.app.table(class).patterns() {
                info!("  {method} {pattern}");
            }
        }
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = self.config.addr);
        Ok(listener)
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown_tx: Arc<mpsc::Sender<()>>, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => {
                    error!("Error setting up Ctrl+C handler: {e}");
                }
            }
        });
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        mut socket: tokio::net::TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        app: Arc<App>,
        config: ServerConfig,
        tasks: &mut JoinSet<()>,
    ) {
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let response = plain_response(
                    StatusCode::ServiceUnavailable,
                    "Server is at capacity, please try again later",
                );
                let _ = socket.write_all(&response.to_bytes()).await;
                return;
            }
        };

        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let _permit = permit;

            if let Err(e) = Self::handle_connection(&mut socket, app, Some(addr), &config).await {
                error!("Error handling connection from {addr}: {e}");
            }
        });
    }

    /// Handle connection errors.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // For other errors, wait a bit before retrying
        tokio::time::sleep(Duration::from_millis(100)).await;
        false
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = Duration::from_secs(30);
        let _ = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        info!("Server shutdown complete");
    }

    /// Start the server and listen for incoming connections.
    pub async fn start(&self) -> Result<(), Error> {
        self.display_server_info();

        let listener = self.setup_listener().await?;

        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let shutdown_tx = Arc::new(shutdown_tx);

        let mut tasks = JoinSet::new();

        Self::setup_ctrl_c_handler(shutdown_tx.clone(), &mut tasks);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            Self::handle_new_connection(
                                socket,
                                addr,
                                semaphore.clone(),
                                self.app.clone(),
                                self.config.clone(),
                                &mut tasks
                            ).await;
                        },
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        Self::perform_shutdown(&mut tasks).await;

        Ok(())
    }

    /// Read one complete request: the header block plus its declared body.
    async fn read_request(
        socket: &mut (impl AsyncRead + Unpin),
        config: &ServerConfig,
    ) -> Result<Vec<u8>, Error> {
        let mut data = Vec::new();
        let mut buf = vec![0; config.read_buffer_size.max(1)];

        loop {
            let n = socket.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            if data.len() > config.max_request_size {
                return Err(Error::PayloadTooLarge(config.max_request_size));
            }

            if let Some(expected) = expected_length(&data) {
                if expected > config.max_request_size {
                    return Err(Error::PayloadTooLarge(config.max_request_size));
                }
                if data.len() >= expected {
                    break;
                }
            }
        }

        Ok(data)
    }

    /// Handle a single connection: read one request, dispatch it and write the
    /// response.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        app: Arc<App>,
        remote_addr: Option<SocketAddr>,
        config: &ServerConfig,
    ) -> Result<(), Error> {
        let data = match with_deadline(config.read_timeout, "reading the request", Self::read_request(socket, config)).await {
            Ok(data) => data,
            Err(e) => {
                let status = match e {
                    Error::PayloadTooLarge(_) => Some(StatusCode::PayloadTooLarge),
                    Error::Timeout(_) => Some(StatusCode::RequestTimeout),
                    _ => None,
                };
                if let Some(status) = status {
                    let response = plain_response(status, e.to_string());
                    socket.write_all(&response.to_bytes()).await?;
                }
                return Err(e);
            }
        };
        if data.is_empty() {
            return Ok(()); // Connection closed
        }

        let mut request = match parse_request(&data) {
            Ok(req) => req,
            Err(e) => {
                let response = plain_response(StatusCode::BadRequest, format!("Error parsing request: {e}"));
                socket.write_all(&response.to_bytes()).await?;
                return Err(Error::ParseError(e));
            }
        };
        if let Some(addr) = remote_addr {
            request.remote_addr = addr.to_string();
        }

        let is_head = request.method == Method::HEAD;
        debug!("{} {} from {}", request.method, request.target, request.remote_addr);

        let mut response = app.handle(request).await.with_header("Connection", "close");
        if is_head {
            response = response.without_body();
        }

        let bytes = response.to_bytes();
        with_deadline(config.write_timeout, "writing the response", async {
            socket.write_all(&bytes).await?;
            socket.flush().await?;
            Ok::<(), Error>(())
        })
        .await
    }
}
