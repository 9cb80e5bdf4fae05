//! Route table: one per method class.

use crate::router::Handler;

/// Mapping from raw pattern string to handler.
///
/// Entries keep their registration order, which is the order the matcher
/// tries them in. Registering a pattern again replaces its handler in place.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<(String, Handler)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `handler` under `pattern`, replacing a previous registration.
    pub fn insert(&mut self, pattern: impl Into<String>, handler: Handler) {
        let pattern = pattern.into();
        match self.routes.iter_mut().find(|(existing, _)| *existing == pattern) {
            Some(entry) => entry.1 = handler,
            None => self.routes.push((pattern, handler)),
        }
    }

    /// The handler registered under exactly `pattern`.
    pub fn get(&self, pattern: &str) -> Option<&Handler> {
        self.routes
            .iter()
            .find(|(existing, _)| existing == pattern)
            .map(|(_, handler)| handler)
    }

    /// Registered patterns in match order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(pattern, _)| pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
