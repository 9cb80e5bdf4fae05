//! An example server demonstrating routes, middleware, JSON and static fallbacks.
//!
//! Run with `RUST_LOG=debug cargo run --example http_server` and try:
//!
//! ```text
//! curl http://127.0.0.1:8080/
//! curl http://127.0.0.1:8080/hello?name=Ann
//! curl http://127.0.0.1:8080/users/42
//! curl -X POST -d '{"name":"Ann","email":"ann@example.com"}' http://127.0.0.1:8080/api/users
//! curl -H 'X-Forwarded-For: 203.0.113.9' http://127.0.0.1:8080/whoami
//! ```

use std::time::{Duration, Instant};

use log::info;
use microroute_rs::content::MemoryAssets;
use microroute_rs::{App, HttpServer, ServerConfig, ServerError, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize)]
struct User {
    name: String,
    email: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut app = App::new();

    // 1. Request logging middleware: work before and after the rest of the chain
    app.middleware(|c| Box::pin(async move {
        let started = Instant::now();
        c.next().await;
        info!(
            "{} {} -> {:?} in {:?}",
            c.request().method,
            c.request().path,
            c.response().status().map(|s| s.as_u16()),
            started.elapsed()
        );
    }));

    // 2. A middleware that short-circuits requests under /admin
    app.middleware(|c| Box::pin(async move {
        if c.request().path.starts_with("/admin") && c.request().get_header("Authorization").is_none() {
            c.write_string_status(StatusCode::Unauthorized, "login first");
            return;
        }
        c.next().await;
    }));

    app.get("/", |c| Box::pin(async move {
        c.write_html("<html><body><h1>Welcome to microroute-rs!</h1></body></html>");
    }));

    app.get("/hello", |c| Box::pin(async move {
        let name = c.query().get("name").unwrap_or("World").to_string();
        c.render("hello.html", &json!({ "name": name }));
    }));

    app.get("/users/:id", |c| Box::pin(async move {
        let body = json!({ "id": c.param("id"), "route": c.route() });
        c.write_json(&body);
    }));

    app.post("/api/users", |c| Box::pin(async move {
        match c.read_json::<User>() {
            Ok(user) => c.write_json_status(StatusCode::Created, &user),
            Err(e @ (ServerError::EmptyBody | ServerError::DecodeError(_))) => {
                c.write_string_status(StatusCode::BadRequest, e.to_string());
            }
            Err(e) => c.write_string_status(StatusCode::InternalServerError, e.to_string()),
        }
    }));

    app.get("/whoami", |c| Box::pin(async move {
        let addr = c.remote_addr();
        c.write_string(addr);
    }));

    app.get("/admin", |c| Box::pin(async move { c.write_string("welcome, admin") }));

    app.get("/old-home", |c| Box::pin(async move { c.redirect("/") }));

    // Unmatched GETs: ./public first, then the embedded assets, then 404
    let assets = MemoryAssets::new()
        .with("public/robots.txt", "User-agent: *\nDisallow:\n")
        .with("views/hello.html", "<p>Hello, {{ .name }}!</p>");
    app.static_dir("./public")
        .static_assets("public")
        .set_assets(assets);
    app.view_assets("views")?;

    app.not_found(|c| Box::pin(async move {
        let path = c.request().path.clone();
        c.write_html_status(StatusCode::NotFound, format!("<h1>Nothing at {path}</h1>"));
    }));

    let config = ServerConfig {
        read_timeout: Some(Duration::from_secs(10)),
        write_timeout: Some(Duration::from_secs(10)),
        ..ServerConfig::with_addr("127.0.0.1:8080".parse()?)
    };

    HttpServer::new(config, app).start().await?;

    Ok(())
}
