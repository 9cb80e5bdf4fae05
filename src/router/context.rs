//! Per-request context threaded through the middleware chain.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::content::template::escape_html;
use crate::content::{assets, clean_segments, mime, static_dir};
use crate::parser::{HttpRequest, Method, QueryValues};
use crate::router::chain::Link;
use crate::router::App;
use crate::server::{Error, ResponseWriter, StatusCode};

/// Data bag key under which the matched route pattern is stored.
pub const ROUTE_KEY: &str = "route";

/// State for a single request.
///
/// Created fresh for every request and dropped when handling completes. It
/// owns the request, the response sink, the extracted path parameters, the
/// parsed query, a free-form data bag and the middleware chain position.
pub struct Context {
    pub(super) app: Arc<App>,
    pub(super) request: HttpRequest,
    pub(super) response: ResponseWriter,
    pub(super) params: HashMap<String, String>,
    pub(super) query: QueryValues,
    pub(super) data: HashMap<String, Value>,
    pub(super) cursor: usize,
    pub(super) chain: Vec<Link>,
}

impl Context {
    pub(crate) fn new(app: Arc<App>, request: HttpRequest, response: ResponseWriter) -> Self {
        let query = QueryValues::from_target(&request.target);
        Self {
            app,
            request,
            response,
            params: HashMap::new(),
            query,
            data: HashMap::new(),
            cursor: 0,
            chain: Vec::new(),
        }
    }

    pub(crate) fn into_response(self) -> ResponseWriter {
        self.response
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseWriter {
        &mut self.response
    }

    /// Path parameters bound by the matched route.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// A single path parameter, e.g. `id` for the pattern `/users/:id`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query(&self) -> &QueryValues {
        &self.query
    }

    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// The matched route pattern, `None` when no route matched.
    pub fn route(&self) -> Option<&str> {
        self.data
            .get(ROUTE_KEY)
            .and_then(Value::as_str)
            .filter(|route| !route.is_empty())
    }

    fn write_body(&mut self, status: StatusCode, content_type: &str, body: &[u8]) {
        self.response.set_header("Content-Type", content_type);
        self.response.write_header(status);
        self.response.write(body);
    }

    /// Write a `200 OK` plain-text response.
    pub fn write_string(&mut self, data: impl AsRef<str>) {
        self.write_string_status(StatusCode::Ok, data);
    }

    pub fn write_string_status(&mut self, status: StatusCode, data: impl AsRef<str>) {
        self.write_body(status, "text/plain", data.as_ref().as_bytes());
    }

    /// Write a `200 OK` HTML response.
    pub fn write_html(&mut self, data: impl AsRef<str>) {
        self.write_html_status(StatusCode::Ok, data);
    }

    pub fn write_html_status(&mut self, status: StatusCode, data: impl AsRef<str>) {
        self.write_body(status, "text/html", data.as_ref().as_bytes());
    }

    /// Serialize `value` and write it as a `200 OK` JSON response.
    ///
    /// Nothing is written when serialization fails.
    pub fn try_write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        self.try_write_json_status(StatusCode::Ok, value)
    }

    pub fn try_write_json_status<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> Result<(), Error> {
        let body = serde_json::to_vec(value).map_err(Error::SerializeFailure)?;
        self.write_body(status, "application/json", &body);
        Ok(())
    }

    /// Like [`try_write_json`](Self::try_write_json), but a serialization
    /// failure is only logged and no response is written.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) {
        self.write_json_status(StatusCode::Ok, value);
    }

    pub fn write_json_status<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        if let Err(e) = self.try_write_json_status(status, value) {
            warn!("{} {}: {e}", self.request.method, self.request.path);
        }
    }

    /// Render template `name` with `data` as a `200 OK` HTML response.
    ///
    /// The template is rendered into a buffer first; on failure nothing is
    /// written.
    pub fn try_render<T: Serialize + ?Sized>(&mut self, name: &str, data: &T) -> Result<(), Error> {
        self.try_render_status(StatusCode::Ok, name, data)
    }

    pub fn try_render_status<T: Serialize + ?Sized>(
        &mut self,
        status: StatusCode,
        name: &str,
        data: &T,
    ) -> Result<(), Error> {
        let app = Arc::clone(&self.app);
        let engine = app
            .templates
            .as_deref()
            .ok_or_else(|| Error::RenderFailure("no templates loaded".to_string()))?;

        let data = serde_json::to_value(data).map_err(Error::SerializeFailure)?;
        let mut body = Vec::new();
        engine.render(name, &data, &mut body)?;

        self.write_body(status, "text/html", &body);
        Ok(())
    }

    /// Like [`try_render`](Self::try_render), but failures are only logged.
    pub fn render<T: Serialize + ?Sized>(&mut self, name: &str, data: &T) {
        self.render_status(StatusCode::Ok, name, data);
    }

    pub fn render_status<T: Serialize + ?Sized>(&mut self, status: StatusCode, name: &str, data: &T) {
        if let Err(e) = self.try_render_status(status, name, data) {
            warn!("{} {}: {e}", self.request.method, self.request.path);
        }
    }

    /// Issue a `307 Temporary Redirect` to `route`.
    ///
    /// A relative target is resolved against the directory of the request path.
    pub fn redirect(&mut self, route: &str) {
        let location = resolve_location(&self.request.path, route);
        self.response.set_header("Location", location.clone());

        if self.request.method == Method::GET || self.request.method == Method::HEAD {
            let mut body = Vec::from(&b"<a href=\""[..]);
            escape_html(&location, &mut body);
            body.extend_from_slice(b"\">Temporary Redirect</a>.\n");
            self.write_body(StatusCode::TemporaryRedirect, "text/html; charset=utf-8", &body);
        } else {
            self.response.write_header(StatusCode::TemporaryRedirect);
        }
    }

    /// Serve `name` from the static directory (the working directory when none
    /// is configured), with the same `index.html` fallback as unmatched GETs.
    pub async fn serve_file_static(&mut self, name: &str) -> Result<(), Error> {
        let root = self.app.static_dir.clone().unwrap_or_else(|| ".".into());
        let (path, data) = static_dir::read_file(&root, name).await?;
        self.write_body(StatusCode::Ok, mime::content_type(&path), &data);
        Ok(())
    }

    /// Serve `name` from the embedded assets, under the static asset prefix
    /// when one is configured.
    pub fn serve_file_asset(&mut self, name: &str) -> Result<(), Error> {
        let app = Arc::clone(&self.app);
        let source = app
            .assets
            .as_deref()
            .ok_or_else(|| Error::StaticAssetNotFound(name.to_string()))?;
        let prefix = app.static_assets.as_deref().unwrap_or("");

        let (asset, data) = assets::lookup(source, prefix, name)?;
        self.write_body(StatusCode::Ok, mime::content_type(&asset), &data);
        Ok(())
    }

    /// Decode the request body as JSON.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyBody`] when the request has no body, [`Error::DecodeError`]
    /// when it is not valid JSON for `T`.
    pub fn read_json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if self.request.body.is_empty() {
            return Err(Error::EmptyBody);
        }
        serde_json::from_slice(&self.request.body).map_err(Error::DecodeError)
    }

    /// The originating client address.
    ///
    /// `X-Forwarded-For` wins over `X-Real-IP`, which wins over the connection
    /// address (with its port stripped). Values are trimmed; the first
    /// non-empty one is returned.
    pub fn remote_addr(&self) -> String {
        for header in ["X-Forwarded-For", "X-Real-IP"] {
            if let Some(value) = self.request.get_header(header) {
                let value = value.trim();
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }

        let addr = self.request.remote_addr.trim();
        host_of(addr).unwrap_or(addr).to_string()
    }
}

/// Strip the port from `host:port` or `[v6]:port`.
fn host_of(addr: &str) -> Option<&str> {
    let (host, port) = addr.rsplit_once(':')?;
    if port.parse::<u16>().is_err() {
        return None;
    }
    match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(bracketed) => Some(bracketed),
        None if host.contains(':') => None,
        None => Some(host),
    }
}

fn resolve_location(current: &str, target: &str) -> String {
    if target.starts_with('/') || target.contains("://") {
        return target.to_string();
    }

    let base = match current.rfind('/') {
        Some(idx) => &current[..=idx],
        None => "/",
    };
    let (path, suffix) = match target.find(['?', '#']) {
        Some(idx) => target.split_at(idx),
        None => (target, ""),
    };

    let joined = format!("{base}{path}");
    let mut cleaned = format!("/{}", clean_segments(&joined).join("/"));
    if joined.ends_with('/') && !cleaned.ends_with('/') {
        cleaned.push('/');
    }
    cleaned.push_str(suffix);
    cleaned
}
