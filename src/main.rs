//! request-dispatch demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum::serve + tower-http layers)
//!                         │
//!                         ▼
//!                     http::request (pathname, query, cookies)
//!                         │
//!                         ▼
//!                     pipeline: [BodyParser] → [middleware…] → Next
//!                         │
//!                         ▼
//!                     routing::RouteTable (first match, params bound)
//!                         │
//!                         ▼
//!     Client Response ◀── handler / 404 / 500
//! ```
//!
//! Serves a small echo application so the dispatch path can be exercised
//! with curl.

use std::path::PathBuf;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use clap::Parser;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use request_dispatch::body::Body;
use request_dispatch::config::{load_config, ServerConfig};
use request_dispatch::lifecycle::{signals, Shutdown};
use request_dispatch::observability::{logging, metrics};
use request_dispatch::{from_fn, App, HttpServer, Next, Outcome, Request, Response, Router};

#[derive(Parser)]
#[command(name = "request-dispatch")]
#[command(about = "Echo server built on the request-dispatch pipeline", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_bytes = config.limits.max_body_bytes,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = build_app(config.limits.max_body_bytes)?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move { signals::shutdown_on_ctrl_c(&signal_shutdown).await });

    let server = HttpServer::new(config, app.into_dispatcher());
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_app(max_body_bytes: usize) -> Result<App, request_dispatch::RegistrationError> {
    let mut app = App::with_body_limit(max_body_bytes);

    app.use_middleware(from_fn(|req: Request, next: Next| async move {
        let mut res = next.run(req).await?;
        res.headers_mut().insert(
            HeaderName::from_static("x-powered-by"),
            HeaderValue::from_static("request-dispatch"),
        );
        Ok(res)
    }));

    app.get("/", |_req: Request| async {
        Ok(Response::text(StatusCode::OK, "request-dispatch is running\n"))
    })?
    .get("/hello/:name", |req: Request| async move {
        let name = req.param("name").unwrap_or("stranger");
        Ok(Response::text(StatusCode::OK, format!("hello, {name}\n")))
    })?
    .post("/echo", echo)?
    .put("/echo", echo)?
    .patch("/echo", echo)?;

    let mut api = Router::new();
    api.use_middleware(from_fn(|req: Request, next: Next| async move {
        tracing::debug!(path = %req.pathname(), "API request");
        next.run(req).await
    }));
    api.get("/users/:id", |req: Request| async move { Response::json(req.params()) })?
        .delete("/users/:id", |req: Request| async move {
            Response::json(&json!({ "deleted": req.param("id") }))
        })?;
    app.mount("/api", api)?;

    Ok(app)
}

/// Describe everything the pipeline decoded for this exchange.
async fn echo(req: Request) -> Outcome {
    let body = match req.body() {
        Some(Body::Json(value)) => json!({ "json": value }),
        Some(Body::Form(fields)) => json!({ "form": fields }),
        Some(Body::Raw(bytes)) => json!({ "raw_bytes": bytes.len() }),
        None => Value::Null,
    };

    let files: Vec<Value> = req
        .files()
        .iter()
        .map(|(field, file)| {
            json!({
                "field": field,
                "filename": file.filename,
                "content_type": file.content_type,
                "size": file.data.len(),
            })
        })
        .collect();

    Response::json(&json!({
        "method": req.method().as_str(),
        "path": req.pathname(),
        "query": req.query(),
        "cookies": req.cookies(),
        "body": body,
        "files": files,
    }))
}
