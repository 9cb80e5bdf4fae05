//! A minimal HTTP request dispatcher.
//!
//! Requests are matched against GET and POST route tables by path pattern,
//! threaded through an ordered middleware chain, and handed to the matched
//! handler. Unmatched GETs fall back to a static directory, then to embedded
//! assets, then to a not-found handler.
//!
//! # Features
//!
//! - Path patterns with named segments (`/users/:id`)
//! - Before/after middleware with explicit continuation ([`Context::next`])
//! - Static files from a directory or an in-memory asset source, with
//!   `index.html` fallback
//! - Plain text, HTML, JSON and template responses
//! - Query string and JSON body decoding, client address resolution
//! - A small tokio server with connection limiting and graceful shutdown
//!
//! # Examples
//!
//! ## Routing
//!
//! ```
//! use microroute_rs::{App, HttpRequest, HttpVersion, Method};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! let mut app = App::new();
//! app.get("/users/:id", |c| Box::pin(async move {
//!     let id = c.param("id").unwrap_or_default().to_string();
//!     c.write_string(format!("user {id}"));
//! }));
//! let app = Arc::new(app);
//!
//! let request = HttpRequest::new(Method::GET, "/users/42", HttpVersion::Http11, HashMap::new());
//! let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let response = runtime.block_on(app.handle(request));
//! assert_eq!(response.body, b"user 42");
//! ```
//!
//! ## Middleware
//!
//! ```
//! use microroute_rs::{App, StatusCode};
//!
//! let mut app = App::new();
//! app.middleware(|c| Box::pin(async move {
//!     if c.request().get_header("Authorization").is_none() {
//!         // Not calling next() stops the chain here.
//!         c.write_string_status(StatusCode::Unauthorized, "login first");
//!         return;
//!     }
//!     c.next().await;
//! }));
//! ```
//!
//! ## Serving
//!
//! ```no_run
//! use microroute_rs::{App, HttpServer, ServerConfig};
//!
//! # async fn run() -> Result<(), microroute_rs::ServerError> {
//! let mut app = App::new();
//! app.static_dir("./public");
//! HttpServer::new(ServerConfig::default(), app).start().await
//! # }
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Export the routing core
pub mod router;

// Export static files, assets and templates
pub mod content;

// Re-export commonly used items for convenience
pub use parser::{parse_request, Error as ParserError, HttpRequest, HttpVersion, Method, MethodClass, QueryValues};
pub use router::{App, Context, Handler, HandlerFuture, RouteTable};
pub use server::{Error as ServerError, HttpResponse, HttpServer, ResponseWriter, ServerConfig, StatusCode};
