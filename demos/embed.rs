//! Embedding walkthrough: two virtual hosts, a mounted sub-API, and a
//! console log subscription.
//!
//! Run with `cargo run --example embed`, then:
//!   curl -H 'Host: api.example.com' http://127.0.0.1:8080/v1/users/7
//!   curl -H 'Host: web.example.com' http://127.0.0.1:8080/pages/home

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use tokio::net::TcpListener;

use vhost_http::lifecycle::{watch_signals, Shutdown};
use vhost_http::logging::LogTarget;
use vhost_http::observability::logging::init_tracing;
use vhost_http::{handler, HttpServer, Response, Router, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("debug");

    let server = HttpServer::new(ServerConfig::default())?;

    // A sub-API built on its own, then mounted under one host.
    let api = Arc::new(Router::new());
    api.add_method_callback(
        "*",
        Method::GET,
        "/users/{id}",
        None,
        handler(|req| async move {
            Ok(Response::json(
                StatusCode::OK,
                &serde_json::json!({ "user": req.path_parameters[0] }),
            ))
        }),
    )?;
    server.add_api("api.example.com", "/v1", api)?;

    // A flat template route on a second host, with a JSON overload.
    server.add_method_callback(
        "web.example.com",
        Method::GET,
        "/pages/{name}",
        None,
        handler(|req| async move {
            Ok(Response::text(
                StatusCode::OK,
                format!("<h1>{}</h1>", req.path_parameters[0]),
            ))
        }),
    )?;
    server.add_method_callback(
        "web.example.com",
        Method::GET,
        "/pages/{name}",
        Some("application/json"),
        handler(|req| async move {
            Ok(Response::json(
                StatusCode::OK,
                &serde_json::json!({ "page": req.path_parameters[0] }),
            ))
        }),
    )?;

    // Watch every dispatched request on the console.
    server.registry().debug("dispatch", LogTarget::Console);

    let shutdown = Arc::new(Shutdown::new());
    let watcher = shutdown.clone();
    tokio::spawn(async move { watch_signals(&watcher).await });

    let listener = TcpListener::bind("127.0.0.1:8080").await?;
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
