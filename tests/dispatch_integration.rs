//! End-to-end tests: wire request in, dispatched response out.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use reqwest::header::HOST;

use vhost_http::routing::WILDCARD_HOST;
use vhost_http::{handler, HttpServer, Response, Router};

mod common;

#[tokio::test]
async fn routed_handler_receives_path_parameters() {
    let server = HttpServer::new(common::test_config()).unwrap();
    server
        .add_method_callback(
            "shop.example.com",
            Method::GET,
            "/items/{id}",
            None,
            handler(|req| async move {
                Ok(Response::text(
                    StatusCode::OK,
                    format!("item {}", req.path_parameters[0]),
                ))
            }),
        )
        .unwrap();

    let (addr, _shutdown) = common::spawn_server(server).await;
    let res = common::client()
        .get(format!("http://{}/items/42", addr))
        .header(HOST, "shop.example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "item 42");
}

#[tokio::test]
async fn unknown_route_returns_structured_404() {
    let server = HttpServer::new(common::test_config()).unwrap();
    let (addr, _shutdown) = common::spawn_server(server).await;

    let res = common::client()
        .get(format!("http://{}/nowhere", addr))
        .header(HOST, "example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["request"], "GET /nowhere HTTP/1.1");
    assert!(body["description"].as_str().unwrap().contains("host"));
}

#[tokio::test]
async fn wrong_method_returns_405() {
    let server = HttpServer::new(common::test_config()).unwrap();
    server
        .add_method_callback(
            WILDCARD_HOST,
            Method::GET,
            "/only-get",
            None,
            handler(|_req| async { Ok(Response::new(StatusCode::OK)) }),
        )
        .unwrap();

    let (addr, _shutdown) = common::spawn_server(server).await;
    let res = common::client()
        .post(format!("http://{}/only-get", addr))
        .header(HOST, "example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 405);
}

#[tokio::test]
async fn mounted_sub_api_resolves_rebased_paths() {
    let server = HttpServer::new(common::test_config()).unwrap();

    let api = Arc::new(Router::new());
    api.add_method_callback(
        WILDCARD_HOST,
        Method::GET,
        "/users/{id}",
        None,
        handler(|req| async move {
            Ok(Response::text(
                StatusCode::OK,
                format!("user {}", req.path_parameters[0]),
            ))
        }),
    )
    .unwrap();
    server.add_api("api.example.com", "/v1", api).unwrap();

    let (addr, _shutdown) = common::spawn_server(server).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/v1/users/7", addr))
        .header(HOST, "api.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "user 7");

    // A host with a mounted tree does not fall back to the flat table.
    let res = client
        .get(format!("http://{}/elsewhere", addr))
        .header(HOST, "api.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn accept_header_selects_content_type_overload() {
    let server = HttpServer::new(common::test_config()).unwrap();
    server
        .add_method_callback(
            WILDCARD_HOST,
            Method::GET,
            "/report",
            Some("application/json"),
            handler(|_req| async {
                Ok(Response::json(
                    StatusCode::OK,
                    &serde_json::json!({"format": "json"}),
                ))
            }),
        )
        .unwrap();
    server
        .add_method_callback(
            WILDCARD_HOST,
            Method::GET,
            "/report",
            Some("text/plain"),
            handler(|_req| async { Ok(Response::text(StatusCode::OK, "plain report")) }),
        )
        .unwrap();

    let (addr, _shutdown) = common::spawn_server(server).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/report", addr))
        .header(HOST, "example.com")
        .header("accept", "text/plain")
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "plain report");

    let res = client
        .get(format!("http://{}/report", addr))
        .header(HOST, "example.com")
        .header("accept", "application/json")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["format"], "json");
}

#[tokio::test]
async fn handler_panic_is_contained() {
    let server = HttpServer::new(common::test_config()).unwrap();
    server
        .add_method_callback(
            WILDCARD_HOST,
            Method::GET,
            "/boom",
            None,
            handler(|req| async move {
                if req.path == "/boom" {
                    panic!("deliberate test panic");
                }
                Ok(Response::new(StatusCode::OK))
            }),
        )
        .unwrap();
    server
        .add_method_callback(
            WILDCARD_HOST,
            Method::GET,
            "/fine",
            None,
            handler(|_req| async { Ok(Response::new(StatusCode::OK)) }),
        )
        .unwrap();

    let (addr, _shutdown) = common::spawn_server(server).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/boom", addr))
        .header(HOST, "example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body: serde_json::Value = res.json().await.unwrap();
    // debug_errors is off by default: no failure detail leaks.
    assert!(body.get("detail").is_none());

    // The server keeps serving.
    let res = client
        .get(format!("http://{}/fine", addr))
        .header(HOST, "example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn graceful_shutdown_closes_listener() {
    let server = HttpServer::new(common::test_config()).unwrap();
    let (addr, shutdown) = common::spawn_server(server).await;
    let client = common::client();

    // Server is up.
    let res = client
        .get(format!("http://{}/", addr))
        .header(HOST, "example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(client
        .get(format!("http://{}/", addr))
        .header(HOST, "example.com")
        .send()
        .await
        .is_err());
}
