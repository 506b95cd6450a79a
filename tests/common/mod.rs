//! Shared helpers for integration tests.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use vhost_http::lifecycle::Shutdown;
use vhost_http::{HttpServer, ServerConfig};

/// Config with an isolated temp log directory per test.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    let dir = std::env::temp_dir().join(format!("vhost-http-it-{}", uuid::Uuid::new_v4()));
    config.logging.dir = dir.to_string_lossy().into_owned();
    config
}

/// Bind an ephemeral port, run the server in the background, and return
/// the address plus the shutdown coordinator.
pub async fn spawn_server(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

/// A client that never pools connections, so shutdown tests see the
/// listener close promptly.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
