//! The middleware chain executor.
//!
//! Every request runs the list `[middleware.., dispatch]`. The context keeps a
//! cursor into that list: the first link runs directly, and each call to
//! [`Context::next`] moves the cursor forward, runs the link there and moves
//! it back once that link returns. Middleware can therefore do work both
//! before and after calling `next`, and one that never calls it stops the
//! chain.

use log::warn;
use serde_json::Value;

use crate::router::context::ROUTE_KEY;
use crate::router::{dispatch, Context, Handler, HandlerFuture};

/// One link of a request's chain.
#[derive(Clone)]
pub(crate) enum Link {
    /// A registered middleware handler.
    Middleware(Handler),
    /// The terminal dispatcher: route handler, static fallbacks or not-found.
    Dispatch,
}

impl Context {
    /// Build the chain for this request and run its first link.
    ///
    /// `route` is the pattern the matcher selected; it is stored in the data bag
    /// (empty when unmatched) for the terminal dispatcher.
    pub(crate) async fn start(&mut self, route: Option<String>) {
        self.chain = self
            .app
            .middleware
            .iter()
            .cloned()
            .map(Link::Middleware)
            .chain(std::iter::once(Link::Dispatch))
            .collect();
        self.cursor = 0;
        self.data
            .insert(ROUTE_KEY.to_string(), Value::String(route.unwrap_or_default()));

        self.run_current().await;
    }

    /// Run the next link of the chain, then restore the current position.
    ///
    /// Middleware call this at most once per invocation; route handlers and the
    /// not-found handler must not call it. Advancing past the end of the chain
    /// is logged and does nothing.
    pub fn next(&mut self) -> HandlerFuture<'_> {
        Box::pin(async move {
            self.cursor += 1;
            self.run_current().await;
            self.cursor -= 1;
        })
    }

    fn run_current(&mut self) -> HandlerFuture<'_> {
        Box::pin(async move {
            let link = self.chain.get(self.cursor).cloned();
            match link {
                Some(Link::Middleware(handler)) => handler(self).await,
                Some(Link::Dispatch) => dispatch::terminal(self).await,
                None => warn!(
                    "next() called past the end of the chain ({} links) for {} {}",
                    self.chain.len(),
                    self.request.method,
                    self.request.path
                ),
            }
        })
    }

    /// The position of the link currently running.
    pub fn chain_position(&self) -> usize {
        self.cursor
    }
}
