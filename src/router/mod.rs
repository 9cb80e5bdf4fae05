//! Request routing and the middleware execution model.
//!
//! A request flows through:
//!
//! 1. [`App::serve_http`] creates a [`Context`] and parses the query.
//! 2. The [`matcher`] finds the first pattern in the method's [`RouteTable`]
//!    that fits the path and binds its `:name` parameters.
//! 3. The middleware chain runs the registered middleware, each deciding
//!    whether to call [`Context::next`].
//! 4. The last link is the [`dispatch`] step: the matched handler, the static
//!    fallbacks for GET, or the not-found handler.

mod app;
mod chain;
mod context;
pub mod dispatch;
mod handler;
pub mod matcher;
mod table;

pub use app::{App, ALLOWED_METHODS};
pub use context::{Context, ROUTE_KEY};
pub use handler::{handler, Handler, HandlerFuture};
pub use table::RouteTable;
