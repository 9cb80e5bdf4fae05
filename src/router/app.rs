//! The application: route tables, middleware and fallbacks.

use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::content::{AssetSource, TemplateEngine, TemplateSet};
use crate::parser::{HttpRequest, MethodClass};
use crate::router::{dispatch, handler, matcher, Context, Handler, HandlerFuture, RouteTable};
use crate::server::{Error, HttpResponse, ResponseWriter, StatusCode};

/// Methods answered by a route table, for the `Allow` header.
pub const ALLOWED_METHODS: &str = "GET, HEAD, POST";

/// A request dispatcher.
///
/// Everything is registered up front through `&mut self`; once the app is
/// wrapped in an [`Arc`] and handed to the server it is only read, so
/// concurrent requests share it without locking.
///
/// # Examples
///
/// ```
/// use microroute_rs::App;
///
/// let mut app = App::new();
/// app.middleware(|c| Box::pin(async move {
///     c.response_mut().set_header("X-Powered-By", "microroute");
///     c.next().await;
/// }));
/// app.get("/users/:id", |c| Box::pin(async move {
///     let id = c.param("id").unwrap_or_default().to_string();
///     c.write_string(format!("user {id}"));
/// }));
/// ```
pub struct App {
    pub(super) get: RouteTable,
    pub(super) post: RouteTable,
    pub(super) middleware: Vec<Handler>,
    pub(super) not_found: Handler,
    pub(super) static_dir: Option<PathBuf>,
    pub(super) static_assets: Option<String>,
    pub(super) assets: Option<Arc<dyn AssetSource>>,
    pub(super) templates: Option<Box<dyn TemplateEngine>>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            get: RouteTable::new(),
            post: RouteTable::new(),
            middleware: Vec::new(),
            not_found: handler(dispatch::not_found),
            static_dir: None,
            static_assets: None,
            assets: None,
            templates: None,
        }
    }
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a GET (and HEAD) handler. Re-registering a pattern replaces it.
    pub fn get<F>(&mut self, pattern: impl Into<String>, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.get.insert(pattern, handler(f));
        self
    }

    /// Register a POST handler. Re-registering a pattern replaces it.
    pub fn post<F>(&mut self, pattern: impl Into<String>, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.post.insert(pattern, handler(f));
        self
    }

    /// Append a middleware. Middleware run in registration order.
    pub fn middleware<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.middleware.push(handler(f));
        self
    }

    /// Replace the not-found handler.
    pub fn not_found<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.not_found = handler(f);
        self
    }

    /// Serve unmatched GET paths from files under `dir`.
    pub fn static_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Serve unmatched GET paths from embedded assets under `prefix`.
    ///
    /// Tried after the static directory. Needs an asset source, see
    /// [`set_assets`](Self::set_assets).
    pub fn static_assets(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.static_assets = Some(prefix.into());
        self
    }

    pub fn set_assets(&mut self, source: impl AssetSource + 'static) -> &mut Self {
        self.assets = Some(Arc::new(source));
        self
    }

    /// Load the `.html` templates in `dir` for [`Context::render`].
    pub fn view(&mut self, dir: impl Into<PathBuf>) -> Result<&mut Self, Error> {
        let set = TemplateSet::from_dir(dir.into())?;
        self.templates = Some(Box::new(set));
        Ok(self)
    }

    /// Load the `.html` assets under `prefix` for [`Context::render`].
    pub fn view_assets(&mut self, prefix: &str) -> Result<&mut Self, Error> {
        let source = self
            .assets
            .as_deref()
            .ok_or_else(|| Error::InternalError("view_assets requires an asset source".to_string()))?;
        let set = TemplateSet::from_assets(source, prefix);
        debug!("loaded {} templates from assets under {prefix}", set.len());
        self.templates = Some(Box::new(set));
        Ok(self)
    }

    /// Render through a custom template engine instead of [`TemplateSet`].
    pub fn set_template_engine(&mut self, engine: impl TemplateEngine + 'static) -> &mut Self {
        self.templates = Some(Box::new(engine));
        self
    }

    /// The route table serving `class`.
    pub fn table(&self, class: MethodClass) -> &RouteTable {
        match class {
            MethodClass::Read => &self.get,
            MethodClass::Write => &self.post,
        }
    }

    /// Dispatch one request, writing the outcome to `writer`.
    ///
    /// Builds a fresh [`Context`], matches the path against the table for the
    /// request's method and runs the middleware chain. Methods without a route
    /// table are answered with `405` and skip the chain.
    pub async fn serve_http(self: &Arc<Self>, writer: &mut ResponseWriter, request: HttpRequest) {
        let class = match request.method.class() {
            Some(class) => class,
            None => {
                writer.set_header("Allow", ALLOWED_METHODS);
                writer.set_header("Content-Type", "text/plain");
                writer.write_header(StatusCode::MethodNotAllowed);
                let err = Error::MethodNotAllowed(request.method, request.path);
                writer.write(err.to_string().as_bytes());
                return;
            }
        };

        let mut context = Context::new(Arc::clone(self), request, std::mem::take(writer));
        let route = matcher::match_route(self.table(class), &context.request.path, &mut context.params)
            .map(str::to_string);
        debug!(
            "{} {} matched {}",
            context.request.method,
            context.request.path,
            route.as_deref().unwrap_or("<none>")
        );

        context.start(route).await;
        *writer = context.into_response();
    }

    /// Dispatch one request and return the finished response.
    pub async fn handle(self: &Arc<Self>, request: HttpRequest) -> HttpResponse {
        let mut writer = ResponseWriter::new();
        self.serve_http(&mut writer, request).await;
        writer.into_response()
    }
}
