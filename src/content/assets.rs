//! Embedded asset lookup.

use std::collections::HashMap;

use crate::content::clean_segments;
use crate::server::Error;

/// A source of named byte blobs, typically compiled into the binary.
///
/// Names are `/`-separated logical paths such as `public/css/site.css`.
pub trait AssetSource: Send + Sync {
    /// The bytes stored under `name`.
    fn asset(&self, name: &str) -> Option<Vec<u8>>;

    /// Every known asset name. Used to preload templates.
    fn asset_names(&self) -> Vec<String>;
}

/// An in-memory [`AssetSource`].
///
/// ```
/// use microroute_rs::content::{AssetSource, MemoryAssets};
///
/// let assets = MemoryAssets::new()
///     .with("public/index.html", "<h1>home</h1>")
///     .with("public/app.js", "console.log(1)");
///
/// assert_eq!(assets.asset("public/app.js").unwrap(), b"console.log(1)");
/// assert_eq!(assets.asset_names().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), data.into());
    }

    pub fn with(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn asset(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(name).cloned()
    }

    fn asset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Join a namespace prefix and a request path into an asset name.
pub fn asset_name(prefix: &str, path: &str) -> String {
    let mut segments = clean_segments(prefix);
    segments.extend(clean_segments(path));
    segments.join("/")
}

/// Look up the asset a request path names under `prefix`.
///
/// Falls back to `index.html` under the resolved name when the direct lookup
/// fails.
///
/// # Returns
///
/// The name that was found and its bytes, or [`Error::StaticAssetNotFound`].
pub fn lookup(source: &dyn AssetSource, prefix: &str, path: &str) -> Result<(String, Vec<u8>), Error> {
    let direct = asset_name(prefix, path);
    if let Some(data) = source.asset(&direct) {
        return Ok((direct, data));
    }

    let index = if direct.is_empty() {
        "index.html".to_string()
    } else {
        format!("{direct}/index.html")
    };
    source
        .asset(&index)
        .map(|data| (index, data))
        .ok_or_else(|| Error::StaticAssetNotFound(path.to_string()))
}
