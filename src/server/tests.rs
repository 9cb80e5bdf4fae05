//! Tests for the HTTP server, the response sink and the connection handler.

#[cfg(test)]
mod server_tests {
    use std::io::{self, Cursor};
    use std::net::SocketAddr;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use log::debug;
    use serde::Serialize;
    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
    use tokio::sync::Semaphore;

    use crate::router::App;
    use crate::server::{Error, HttpResponse, HttpServer, ResponseWriter, ServerConfig, StatusCode};

    // Mock TcpStream for testing
    struct MockTcpStream {
        read_data: Cursor<Vec<u8>>,
        write_data: Vec<u8>,
    }

    impl MockTcpStream {
        fn new(read_data: impl Into<Vec<u8>>) -> Self {
            Self {
                read_data: Cursor::new(read_data.into()),
                write_data: Vec::new(),
            }
        }

        fn written(&self) -> String {
            String::from_utf8_lossy(&self.write_data).into_owned()
        }
    }

    impl AsyncRead for MockTcpStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let n = std::io::Read::read(&mut this.read_data, buf.initialize_unfilled())?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockTcpStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    // A client that connects and never sends anything.
    #[derive(Default)]
    struct StalledStream {
        write_data: Vec<u8>,
    }

    impl AsyncRead for StalledStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Pending
        }
    }

    impl AsyncWrite for StalledStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.get_mut().write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn test_app() -> Arc<App> {
        let mut app = App::new();
        app.get("/test", |c| Box::pin(async move { c.write_string("Test response") }));
        app.get("/ip", |c| Box::pin(async move {
            let addr = c.remote_addr();
            c.write_string(addr);
        }));
        app.post("/echo", |c| Box::pin(async move {
            let body = String::from_utf8_lossy(&c.request().body).into_owned();
            c.write_string_status(StatusCode::Created, body);
        }));
        Arc::new(app)
    }

    async fn serve(raw: &[u8], config: &ServerConfig) -> (Result<(), Error>, String) {
        let mut stream = MockTcpStream::new(raw);
        let result = HttpServer::handle_connection(&mut stream, test_app(), None, config).await;
        (result, stream.written())
    }

    #[test]
    fn test_server_creation() {
        let config = ServerConfig {
            max_connections: 100,
            read_buffer_size: 4096,
            ..ServerConfig::with_addr("127.0.0.1:9000".parse().unwrap())
        };

        let server = HttpServer::new(config.clone(), App::new());
        assert_eq!(server.config.addr, config.addr);
        assert_eq!(server.config.max_connections, 100);
        assert_eq!(server.config.read_buffer_size, 4096);
        assert!(server.app.table(crate::parser::MethodClass::Read).is_empty());
    }

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_connections, 1024);
        assert_eq!(config.read_buffer_size, 8192);
        assert_eq!(config.max_request_size, 1024 * 1024);
        assert!(config.read_timeout.is_none());
        assert!(config.write_timeout.is_none());
    }

    #[tokio::test]
    async fn test_handle_connection_with_valid_request() {
        let (result, response) = serve(b"GET /test HTTP/1.1\r\nHost: localhost\r\n\r\n", &ServerConfig::default()).await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain\r\n"));
        assert!(response.contains("Content-Length: 13\r\n"));
        assert!(response.contains("Connection: close\r\n"));
        assert!(response.ends_with("\r\n\r\nTest response"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_not_found() {
        let (result, response) = serve(b"GET /nonexistent HTTP/1.1\r\nHost: localhost\r\n\r\n", &ServerConfig::default()).await;

        // A 404 is a normal response, not a connection error.
        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with("Error 404 : Page Not Found!!!"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_method_not_allowed() {
        let (result, response) = serve(b"PUT /test HTTP/1.1\r\nHost: localhost\r\n\r\n", &ServerConfig::default()).await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(response.contains("Allow: GET, HEAD, POST\r\n"));
        assert!(response.contains("Method PUT not allowed for path: /test"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_invalid_request() {
        let (result, response) = serve(b"INVALID REQUEST", &ServerConfig::default()).await;

        assert!(matches!(result, Err(Error::ParseError(_))));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("Error parsing request:"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_undecodable_path() {
        let (result, response) = serve(b"GET /test%FF HTTP/1.1\r\nHost: localhost\r\n\r\n", &ServerConfig::default()).await;

        assert!(matches!(result, Err(Error::ParseError(_))));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("Invalid path encoding: /test%FF"));
    }

    #[tokio::test]
    async fn test_handle_connection_without_data() {
        let (result, response) = serve(b"", &ServerConfig::default()).await;
        assert!(result.is_ok());
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_head_drops_body() {
        let (result, response) = serve(b"HEAD /test HTTP/1.1\r\nHost: localhost\r\n\r\n", &ServerConfig::default()).await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Length: 13\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
        assert!(!response.contains("Test response"));
    }

    #[tokio::test]
    async fn test_post_body_across_reads() {
        let config = ServerConfig {
            read_buffer_size: 8,
            ..ServerConfig::default()
        };
        let raw = b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 26\r\n\r\nabcdefghijklmnopqrstuvwxyz";
        let (result, response) = serve(raw, &config).await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(response.ends_with("abcdefghijklmnopqrstuvwxyz"));
    }

    #[tokio::test]
    async fn test_request_too_large() {
        let config = ServerConfig {
            max_request_size: 64,
            ..ServerConfig::default()
        };
        let raw = b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 1000\r\n\r\nshort";
        let (result, response) = serve(raw, &config).await;

        assert!(matches!(result, Err(Error::PayloadTooLarge(64))));
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(response.contains("Request larger than 64 bytes"));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let config = ServerConfig {
            read_timeout: Some(Duration::from_millis(20)),
            ..ServerConfig::default()
        };
        let mut stream = StalledStream::default();
        let result = HttpServer::handle_connection(&mut stream, test_app(), None, &config).await;

        assert!(matches!(result, Err(Error::Timeout(_))));
        let response = String::from_utf8_lossy(&stream.write_data);
        assert!(response.starts_with("HTTP/1.1 408 Request Timeout\r\n"));
    }

    #[tokio::test]
    async fn test_remote_addr_from_connection() {
        let mut stream = MockTcpStream::new(&b"GET /ip HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);
        let peer: SocketAddr = "192.0.2.10:40000".parse().unwrap();
        let result = HttpServer::handle_connection(&mut stream, test_app(), Some(peer), &ServerConfig::default()).await;

        assert!(result.is_ok());
        assert!(stream.written().ends_with("\r\n\r\n192.0.2.10"));

        let mut stream = MockTcpStream::new(&b"GET /ip HTTP/1.1\r\nHost: localhost\r\nX-Forwarded-For: 203.0.113.9\r\n\r\n"[..]);
        HttpServer::handle_connection(&mut stream, test_app(), Some(peer), &ServerConfig::default())
            .await
            .unwrap();
        assert!(stream.written().ends_with("\r\n\r\n203.0.113.9"));
    }

    #[test]
    fn test_response_to_bytes() {
        let response = HttpResponse::new(StatusCode::Created)
            .with_content_type("text/plain")
            .with_body_string("done");
        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(text.contains("Server: microroute-rs\r\n"));
        assert!(text.contains("Content-Length: 4\r\n"));
        assert!(text.ends_with("\r\n\r\ndone"));
    }

    #[test]
    fn test_response_with_json() {
        #[derive(Serialize)]
        struct Status {
            ok: bool,
        }

        let response = HttpResponse::new(StatusCode::Ok).with_json(&Status { ok: true }).unwrap();
        assert_eq!(response.headers.get("Content-Type").unwrap(), "application/json");
        assert_eq!(response.body, br#"{"ok":true}"#);
    }

    #[test]
    fn test_writer_status_written_once() {
        let mut writer = ResponseWriter::new();
        assert!(!writer.is_written());

        writer.set_header("content-type", "text/plain");
        writer.set_header("Content-Type", "text/html");
        assert_eq!(writer.header("CONTENT-TYPE"), Some("text/html"));

        writer.write_header(StatusCode::Accepted);
        writer.write_header(StatusCode::NotFound);
        writer.set_header("X-Late", "ignored");
        writer.write(b"body");

        assert_eq!(writer.status(), Some(StatusCode::Accepted));
        assert!(writer.header("X-Late").is_none());

        let response = writer.into_response();
        assert_eq!(response.status, StatusCode::Accepted);
        assert_eq!(response.headers.get("Content-Type").unwrap(), "text/html");
        assert_eq!(response.body, b"body");
    }

    #[test]
    fn test_writer_headers_are_not_duplicated() {
        let mut writer = ResponseWriter::new();
        writer.set_header("content-length", "999");
        writer.set_header("server", "custom");
        writer.set_header("content-type", "text/plain");
        writer.write(b"four");

        let response = writer.into_response();
        let named = |name: &str| {
            response
                .headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(named("Content-Length"), vec!["4"]);
        assert_eq!(named("Server"), vec!["custom"]);
        assert_eq!(named("Content-Type"), vec!["text/plain"]);

        let text = String::from_utf8(response.to_bytes()).unwrap();
        assert_eq!(text.to_ascii_lowercase().matches("content-length:").count(), 1);
    }

    #[test]
    fn test_writer_implicit_ok() {
        let mut writer = ResponseWriter::new();
        writer.write(b"hi");
        assert_eq!(writer.status(), Some(StatusCode::Ok));
        assert_eq!(writer.body(), b"hi");

        let untouched = ResponseWriter::new().into_response();
        assert_eq!(untouched.status, StatusCode::Ok);
        assert!(untouched.body.is_empty());
        assert_eq!(untouched.headers.get("Content-Length").unwrap(), "0");
    }

    #[tokio::test]
    async fn test_connection_limiting() {
        let max_connections = 2;
        let semaphore = Arc::new(Semaphore::new(max_connections));
        let active = Arc::new(AtomicUsize::new(0));
        let app = test_app();

        let mut handles = Vec::new();
        for id in 0..max_connections {
            let permit = semaphore.clone().try_acquire_owned().unwrap();
            let active = active.clone();
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                active.fetch_add(1, Ordering::SeqCst);
                let mut stream = MockTcpStream::new(&b"GET /test HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);
                tokio::time::sleep(Duration::from_millis(10)).await;
                HttpServer::handle_connection(&mut stream, app, None, &ServerConfig::default())
                    .await
                    .unwrap();
                active.fetch_sub(1, Ordering::SeqCst);
                debug!("connection {id} finished");
                stream.written()
            }));
        }

        // Every slot is taken, so the next connection would be turned away.
        assert!(semaphore.clone().try_acquire_owned().is_err());

        for handle in handles {
            assert!(handle.await.unwrap().starts_with("HTTP/1.1 200 OK\r\n"));
        }
        assert_eq!(active.load(Ordering::SeqCst), 0);
        assert_eq!(semaphore.available_permits(), max_connections);
    }
}
