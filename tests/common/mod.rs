//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use api_gateway::config::{GatewayConfig, RouteConfig, TargetConfig};
use api_gateway::lifecycle::Shutdown;
use api_gateway::routing::{RouteTable, SharedRouteTable};
use api_gateway::downstream::HttpDownstreamClient;
use api_gateway::tenancy::TenantResolver;
use api_gateway::HttpServer;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral port.
pub async fn start_stub(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Raw TCP backend that closes the first `drop_first` connections without
/// answering, then replies `200 OK` with `body`. Returns the connection count.
pub async fn start_flaky_backend(drop_first: u32, body: &'static str) -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicU32::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                if seen < drop_first {
                    drop(socket);
                    return;
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, connections)
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn route(id: &str, prefix: &str, backend: SocketAddr, strip_prefix: bool) -> RouteConfig {
    RouteConfig {
        id: id.to_string(),
        path_prefixes: vec![prefix.to_string()],
        strip_prefix,
        target: TargetConfig::from_base_url(format!("http://{backend}")),
    }
}

/// Gateway config with fast retries suitable for tests.
pub fn gateway_config(routes: Vec<RouteConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.downstream.retry_delay_ms = 20;
    config.downstream.connect_timeout_ms = 1_000;
    config.downstream.request_timeout_ms = 2_000;
    config.routes = routes;
    config
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let server = HttpServer::new(config).expect("gateway config should build");
    serve(server).await
}

/// Start a gateway with a custom tenant resolver.
pub async fn start_gateway_with_tenants(
    config: GatewayConfig,
    tenants: Arc<dyn TenantResolver>,
) -> TestGateway {
    let routes = Arc::new(SharedRouteTable::new(
        RouteTable::from_config(&config.routes).unwrap(),
    ));
    let downstream = Arc::new(HttpDownstreamClient::new(&config.downstream).unwrap());
    serve(HttpServer::with_parts(config, routes, downstream, tenants)).await
}

async fn serve(server: HttpServer) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let stopped = shutdown.wait();
    tokio::spawn(async move {
        let _ = server.run(listener, stopped).await;
    });
    TestGateway { addr, shutdown }
}

/// Client without connection reuse or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
