//! Content sources the dispatcher falls back to or renders from.
//!
//! - [`static_dir`]: files under a filesystem directory
//! - [`assets`]: bytes compiled into the binary or held in memory
//! - [`template`]: HTML templates rendered with JSON data
//! - [`mime`]: content types by file extension

pub mod assets;
pub mod mime;
pub mod static_dir;
pub mod template;

pub use assets::{AssetSource, MemoryAssets};
pub use template::{TemplateEngine, TemplateSet};

/// Split a request path into clean segments.
///
/// Empty and `.` segments are dropped and `..` removes the previous segment,
/// never climbing above the root.
pub(crate) fn clean_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments
}
