//! Serving files from a filesystem directory.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::content::clean_segments;
use crate::server::Error;

/// Resolve a request path to a file under `root`. The result never leaves `root`.
pub fn resolve(root: &Path, path: &str) -> PathBuf {
    let mut resolved = root.to_path_buf();
    for segment in clean_segments(path) {
        resolved.push(segment);
    }
    resolved
}

/// Read the file at `path`, refusing directories.
///
/// The handle is dropped on every return path.
async fn read_regular(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path).await?;
    let metadata = file.metadata().await?;
    if metadata.is_dir() {
        return Err(io::Error::other(format!("{} is a directory", path.display())));
    }

    let mut data = Vec::with_capacity(metadata.len() as usize);
    file.read_to_end(&mut data).await?;
    Ok(data)
}

/// Read the file a request path names under `root`.
///
/// Falls back to `index.html` inside the resolved path when the direct lookup
/// fails (missing file or directory).
///
/// # Returns
///
/// The path that was actually read and its contents, or
/// [`Error::StaticAssetNotFound`] when neither lookup succeeds.
pub async fn read_file(root: &Path, path: &str) -> Result<(PathBuf, Vec<u8>), Error> {
    let direct = resolve(root, path);
    match read_regular(&direct).await {
        Ok(data) => return Ok((direct, data)),
        Err(e) => debug!("static lookup {} failed: {e}", direct.display()),
    }

    let index = direct.join("index.html");
    match read_regular(&index).await {
        Ok(data) => Ok((index, data)),
        Err(e) => {
            debug!("static lookup {} failed: {e}", index.display());
            Err(Error::StaticAssetNotFound(path.to_string()))
        }
    }
}
