//! Shared helpers for the integration tests

#![allow(dead_code)]

use mockhttp::http::{FdSessionOps, HttpClient};
use mockhttp::{MockHttpServer, ServerConfig};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Loopback config on an ephemeral port
pub fn test_config() -> ServerConfig {
    ServerConfig::default()
        .with_host(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_port(0)
        .with_read_timeout(Duration::from_secs(2))
}

/// A server that is not started yet
pub fn server() -> MockHttpServer {
    init_tracing();
    MockHttpServer::with_config(test_config())
}

/// A connected client with a short timeout
pub fn client(server: &MockHttpServer) -> HttpClient<FdSessionOps> {
    let addr = server.local_addr().expect("server is not running");
    let mut client = HttpClient::connect(addr).expect("connect to mock server");
    client.set_timeout(Duration::from_secs(2));
    client
}
