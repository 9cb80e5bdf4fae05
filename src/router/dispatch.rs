//! Terminal dispatcher and the default not-found handler.

use std::sync::Arc;

use log::debug;

use crate::content::{assets, mime, static_dir};
use crate::parser::MethodClass;
use crate::router::{Context, HandlerFuture};
use crate::server::{Error, StatusCode};

/// Body of the default not-found response.
pub const NOT_FOUND_BODY: &str = "Error 404 : Page Not Found!!!";

/// The default not-found handler: a plain-text 404.
pub fn not_found(c: &mut Context) -> HandlerFuture<'_> {
    Box::pin(async move {
        c.write_string_status(StatusCode::NotFound, NOT_FOUND_BODY);
    })
}

/// The last link of every chain.
///
/// Read-class requests try, in order: the matched route, the static directory,
/// the embedded assets, then the not-found handler. Write-class requests go
/// straight from the matched route to the not-found handler.
pub(crate) async fn terminal(c: &mut Context) {
    let app = Arc::clone(&c.app);
    let class = c.request.method.class();
    let route = c.route().map(str::to_string);

    if let Some(route) = route {
        let handler = class.and_then(|class| app.table(class).get(&route)).cloned();
        if let Some(handler) = handler {
            debug!("{} {} -> {route}", c.request.method, c.request.path);
            handler(c).await;
            return;
        }
        debug!("route {route} is not registered; falling back");
    }

    if class == Some(MethodClass::Read) {
        if app.static_dir.is_some() && serve_static_dir(c).await.is_ok() {
            return;
        }
        if app.static_assets.is_some() && serve_static_assets(c).is_ok() {
            return;
        }
    }

    (app.not_found)(c).await;
}

async fn serve_static_dir(c: &mut Context) -> Result<(), Error> {
    let root = match c.app.static_dir.clone() {
        Some(root) => root,
        None => return Err(Error::StaticAssetNotFound(c.request.path.clone())),
    };
    let (path, data) = static_dir::read_file(&root, &c.request.path).await?;
    debug!("{} served from {}", c.request.path, path.display());

    c.response.set_header("Content-Type", mime::content_type(&path));
    c.response.write_header(StatusCode::Ok);
    c.response.write(&data);
    Ok(())
}

fn serve_static_assets(c: &mut Context) -> Result<(), Error> {
    let app = Arc::clone(&c.app);
    let (source, prefix) = match (app.assets.as_deref(), app.static_assets.as_deref()) {
        (Some(source), Some(prefix)) => (source, prefix),
        _ => return Err(Error::StaticAssetNotFound(c.request.path.clone())),
    };
    let (name, data) = assets::lookup(source, prefix, &c.request.path)?;
    debug!("{} served from asset {name}", c.request.path);

    c.response.set_header("Content-Type", mime::content_type(&name));
    c.response.write_header(StatusCode::Ok);
    c.response.write(&data);
    Ok(())
}
