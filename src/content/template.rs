//! HTML templates.
//!
//! The dispatcher renders through the [`TemplateEngine`] trait so any engine
//! can be plugged in. [`TemplateSet`] is the built-in engine: it substitutes
//! `{{ .field.nested }}` lookups against JSON data, HTML-escaped, and `{{ . }}`
//! for the whole value.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde_json::Value;

use crate::content::AssetSource;
use crate::server::Error;

/// Renders named templates into a buffer.
pub trait TemplateEngine: Send + Sync {
    /// Render template `name` with `data`, appending to `out`.
    ///
    /// Implementations should leave `out` untouched on failure where they can;
    /// the caller discards it either way.
    fn render(&self, name: &str, data: &Value, out: &mut Vec<u8>) -> Result<(), Error>;
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String),
    /// A dotted lookup path; empty means the whole value.
    Lookup(Vec<String>),
}

fn parse(name: &str, source: &str) -> Result<Vec<Piece>, Error> {
    let mut pieces = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            pieces.push(Piece::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| Error::RenderFailure(format!("{name}: unterminated action")))?;

        let action = after[..end].trim();
        let path = action
            .strip_prefix('.')
            .ok_or_else(|| Error::RenderFailure(format!("{name}: unsupported action {{{{{action}}}}}")))?;
        let lookup = if path.is_empty() {
            Vec::new()
        } else {
            path.split('.').map(str::to_string).collect::<Vec<_>>()
        };
        if lookup.iter().any(|field| field.is_empty()) {
            return Err(Error::RenderFailure(format!("{name}: bad field path {{{{{action}}}}}")));
        }
        pieces.push(Piece::Lookup(lookup));

        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Text(rest.to_string()));
    }
    Ok(pieces)
}

pub(crate) fn escape_html(text: &str, out: &mut Vec<u8>) {
    for ch in text.chars() {
        match ch {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            '"' => out.extend_from_slice(b"&#34;"),
            '\'' => out.extend_from_slice(b"&#39;"),
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

/// A set of parsed templates, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<String, Vec<Piece>>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` and store it as `name`, replacing any previous template.
    pub fn add(&mut self, name: impl Into<String>, source: &str) -> Result<(), Error> {
        let name = name.into();
        let pieces = parse(&name, source)?;
        self.templates.insert(name, pieces);
        Ok(())
    }

    /// Load every `.html` file directly inside `dir`.
    ///
    /// Subdirectories are not descended into. Files that cannot be read or
    /// parsed are skipped with a warning; only an unreadable `dir` is an error.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let mut set = Self::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.is_dir() || path.extension().and_then(|ext| ext.to_str()) != Some("html") {
                continue;
            }
            let name = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(e) => {
                    warn!("skipping template {}: {e}", path.display());
                    continue;
                }
            };
            if let Err(e) = set.add(name, &source) {
                warn!("skipping template {}: {e}", path.display());
            }
        }
        debug!("loaded {} templates from {}", set.len(), dir.as_ref().display());
        Ok(set)
    }

    /// Load every `.html` asset whose name starts with `prefix/`.
    ///
    /// Templates are keyed by the last segment of the asset name.
    pub fn from_assets(source: &dyn AssetSource, prefix: &str) -> Self {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        let mut set = Self::new();

        for name in source.asset_names() {
            if !name.starts_with(&prefix) || !name.ends_with(".html") {
                continue;
            }
            let data = match source.asset(&name) {
                Some(data) => data,
                None => continue,
            };
            let text = match String::from_utf8(data) {
                Ok(text) => text,
                Err(e) => {
                    warn!("skipping template asset {name}: {e}");
                    continue;
                }
            };
            let key = name.rsplit('/').next().unwrap_or(name.as_str()).to_string();
            if let Err(e) = set.add(key, &text) {
                warn!("skipping template asset {name}: {e}");
            }
        }
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateEngine for TemplateSet {
    fn render(&self, name: &str, data: &Value, out: &mut Vec<u8>) -> Result<(), Error> {
        let pieces = self
            .templates
            .get(name)
            .ok_or_else(|| Error::RenderFailure(format!("no template named {name}")))?;

        for piece in pieces {
            match piece {
                Piece::Text(text) => out.extend_from_slice(text.as_bytes()),
                Piece::Lookup(path) => {
                    let value = path.iter().try_fold(data, |value, field| value.get(field.as_str()));
                    match value {
                        None | Some(Value::Null) => {}
                        Some(Value::String(s)) => escape_html(s, out),
                        Some(other) => escape_html(&other.to_string(), out),
                    }
                }
            }
        }
        Ok(())
    }
}
