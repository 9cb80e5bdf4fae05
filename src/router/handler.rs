//! Handler types shared by routes, middleware and the not-found fallback.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::router::Context;

/// Type alias for the boxed future a handler returns, borrowing the context.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Type alias for a handler: route handlers, middleware and the not-found
/// handler all share this signature.
///
/// Handlers write to the response through the context and may call
/// [`Context::next`] (middleware only).
pub type Handler = Arc<dyn for<'a> Fn(&'a mut Context) -> HandlerFuture<'a> + Send + Sync>;

/// Wrap a closure into a shareable [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: for<'a> Fn(&'a mut Context) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}
