//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};

use pcosync_core::config::DEFAULT_PORT;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_port(DEFAULT_PORT)
    }
}

impl ServerConfig {
    /// Creates a configuration listening on all interfaces at `port`.
    pub fn from_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        }
    }

    /// Builder: set bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }
}
