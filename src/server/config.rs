//! Server configuration

use super::DispatchMode;
use crate::http::DEFAULT_HTTP_PORT;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default time `start` waits for the accept loop to report it is listening
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(2);

/// Default time `stop` waits for the accept loop to exit
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default wait for request bytes and write readiness on a connection
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

pub use crate::http::connection::DEFAULT_DRAIN_GRACE;

/// Configuration for a [`MockHttpServer`](super::MockHttpServer)
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bind address
    pub host: IpAddr,
    /// Bind port; `0` picks an ephemeral port
    pub port: u16,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
    pub read_timeout: Duration,
    /// Idle gap that ends the initial input drain of a connection
    pub drain_grace: Duration,
    pub dispatch: DispatchMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_HTTP_PORT,
            start_timeout: DEFAULT_START_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            drain_grace: DEFAULT_DRAIN_GRACE,
            dispatch: DispatchMode::default(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// The address the listener binds to
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
