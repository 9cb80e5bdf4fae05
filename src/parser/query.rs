//! Query string values.

use std::collections::HashMap;

/// Multi-valued query parameters decoded from a request target.
///
/// Decoding follows `application/x-www-form-urlencoded` rules (`+` is a space,
/// percent escapes are decoded). Malformed input never fails; whatever decodes
/// is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues {
    values: HashMap<String, Vec<String>>,
}

impl QueryValues {
    /// Parse the query component of a request target such as `/search?q=rust&page=2`.
    ///
    /// Anything before the first `?` is ignored, as is a trailing `#fragment`.
    pub fn from_target(target: &str) -> Self {
        let query = match target.split_once('?') {
            Some((_, query)) => query,
            None => return Self::default(),
        };
        let query = query.split_once('#').map_or(query, |(q, _)| q);
        Self::parse(query)
    }

    /// Parse a bare query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            values.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        Self { values }
    }

    /// The first value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value for `name`, in the order they appeared.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
