//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;

use percent_encoding::percent_decode_str;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The raw request target, including any query string
    pub target: String,
    /// The percent-decoded path component of the target, without query or
    /// fragment. Routing and static lookups use this; `target` keeps the raw text.
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// The request body, bounded by `Content-Length` when present
    pub body: Vec<u8>,
    /// The peer address of the connection (`ip:port`), empty when unknown
    pub remote_addr: String,
}

impl HttpRequest {
    /// Create a new HTTP request.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `target` - The request target, e.g. `/users/42?verbose=1`
    /// * `version` - The HTTP version
    /// * `headers` - The HTTP headers
    ///
    /// # Returns
    ///
    /// A new HTTP request with an empty body and no peer address. Escapes in
    /// the path that do not decode to UTF-8 are replaced with U+FFFD;
    /// [`parse_request`] rejects such targets instead.
    pub fn new(method: Method, target: impl Into<String>, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let target = target.into();
        let path = percent_decode_str(path_of(&target)).decode_utf8_lossy().into_owned();

        Self {
            method,
            target,
            path,
            version,
            headers,
            body: Vec::new(),
            remote_addr: String::new(),
        }
    }

    /// Create a new HTTP request with a body.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `target` - The request target
    /// * `version` - The HTTP version
    /// * `headers` - The HTTP headers
    /// * `body` - The request body
    ///
    /// # Returns
    ///
    /// A new HTTP request with the specified body
    pub fn with_body(
        method: Method,
        target: impl Into<String>,
        version: HttpVersion,
        headers: HashMap<String, String>,
        body: Vec<u8>,
    ) -> Self {
        let mut request = Self::new(method, target, version, headers);
        request.body = body;
        request
    }

    /// Set the peer address the request arrived from.
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    /// Get a header value.
    ///
    /// # Arguments
    ///
    /// * `name` - The header name
    ///
    /// # Returns
    ///
    /// The header value, if it exists
    pub fn get_header(&self, name: &str) -> Option<&String> {
        // Headers are case-insensitive, so we need to do a case-insensitive lookup
        self.headers.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                Some(v)
            } else {
                None
            }
        })
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Check if the request declares a JSON body.
    pub fn is_json(&self) -> bool {
        self.get_header("Content-Type")
            .is_some_and(|content_type| content_type.starts_with("application/json"))
    }
}

/// Extract the path component of a request target.
///
/// Absolute-form targets (`http://host/path`) are reduced to their path; an
/// absolute-form target without a path yields `/`.
fn path_of(target: &str) -> &str {
    let target = target
        .split_once('?')
        .map_or(target, |(path, _)| path);
    let target = target
        .split_once('#')
        .map_or(target, |(path, _)| path);

    for scheme in ["http://", "https://"] {
        if let Some(rest) = target.strip_prefix(scheme) {
            return rest.find('/').map_or("/", |idx| &rest[idx..]);
        }
    }
    target
}

/// Locate the end of the header block.
///
/// Returns the offset of the first body byte, accepting both `\r\n\r\n` and
/// bare `\n\n` terminators.
fn header_end(input: &[u8]) -> Option<usize> {
    let crlf = input.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4);
    let lf = input.windows(2).position(|w| w == b"\n\n").map(|pos| pos + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Find the declared `Content-Length` in a raw header block.
fn content_length(head: &str) -> Option<&str> {
    head.lines().skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("Content-Length") {
            Some(value.trim())
        } else {
            None
        }
    })
}

/// Compute how many bytes a complete request occupies.
///
/// # Arguments
///
/// * `input` - The bytes received so far
///
/// # Returns
///
/// `None` while the header block is still incomplete, otherwise the header
/// length plus the declared `Content-Length` (zero when absent or invalid; the
/// parser reports invalid lengths).
pub fn expected_length(input: &[u8]) -> Option<usize> {
    let end = header_end(input)?;
    let head = String::from_utf8_lossy(&input[..end]);
    let body_len = content_length(&head)
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    Some(end + body_len)
}

/// Parse an HTTP request from a byte slice.
///
/// # Arguments
///
/// * `input` - A byte slice containing the HTTP request to parse
///
/// # Returns
///
/// The parsed HTTP request, or an error if the request is invalid
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    // Split the header block from the body
    let (head, body) = match header_end(input) {
        Some(end) => (&input[..end], &input[end..]),
        None => (input, &input[input.len()..]),
    };

    let head = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(_) => return Err(Error::MalformedRequestLine("Invalid UTF-8".to_string())),
    };

    let mut lines = head.lines();

    // Parse the request line
    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    // Split the request line into method, target, and version
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let target = parts[1];
    if !(target.starts_with('/') || target.starts_with("http://") || target.starts_with("https://")) {
        return Err(Error::InvalidPath);
    }

    if percent_decode_str(path_of(target)).decode_utf8().is_err() {
        return Err(Error::InvalidPathEncoding(target.to_string()));
    }

    let version = HttpVersion::from_str(parts[2])?;

    // Parse the headers
    let mut headers = HashMap::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let (name, value) = match line.split_once(':') {
            Some(pair) => pair,
            None => return Err(Error::InvalidHeaderFormat),
        };

        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    if version.requires_host() && !headers.keys().any(|k| k.eq_ignore_ascii_case("Host")) {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    // Bound the body by the declared length
    let body = match content_length(head) {
        Some(value) => {
            let len = value
                .parse::<usize>()
                .map_err(|_| Error::InvalidContentLength(value.to_string()))?;
            &body[..len.min(body.len())]
        }
        None => body,
    };

    Ok(HttpRequest::with_body(method, target, version, headers, body.to_vec()))
}
