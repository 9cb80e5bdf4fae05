//! HTTP request parsing.
//!
//! Turns the raw bytes read from a connection into an [`HttpRequest`] the
//! dispatcher can route: request line, headers, a `Content-Length` bounded
//! body, and form-encoded query values.

mod request;
mod method;
mod version;
mod query;
mod error;

// Re-export public items
pub use request::HttpRequest;
pub use method::{Method, MethodClass};
pub use version::HttpVersion;
pub use query::QueryValues;
pub use error::Error;

// Re-export the parsing entry points
pub use request::{expected_length, parse_request};
