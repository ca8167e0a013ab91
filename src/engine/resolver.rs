//! Server address resolution.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::operation::error::OpError;

/// Port used when a server string carries none.
pub const DEFAULT_PORT: u16 = 80;

/// Turns a server string into a socket address.
///
/// Literal addresses are parsed in place. Hostnames go through the system
/// resolver only when enabled, since the engine calls this with the
/// region lock held.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    resolve_hostnames: bool,
}

impl Resolver {
    pub fn new(resolve_hostnames: bool) -> Self {
        Self { resolve_hostnames }
    }

    pub fn resolves_hostnames(&self) -> bool {
        self.resolve_hostnames
    }

    pub fn resolve(&self, server: &str) -> Result<SocketAddr, OpError> {
        let server = server.trim();
        if let Ok(addr) = server.parse::<SocketAddr>() {
            return Ok(addr);
        }
        if let Ok(ip) = server.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, DEFAULT_PORT));
        }
        if let Some(ip) = server
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(|inner| inner.parse::<IpAddr>().ok())
        {
            return Ok(SocketAddr::new(ip, DEFAULT_PORT));
        }

        if !self.resolve_hostnames {
            return Err(invalid(server, "not an IP address and hostname resolution is disabled"));
        }
        self.lookup(server)
    }

    fn lookup(&self, server: &str) -> Result<SocketAddr, OpError> {
        let (host, port) = match server.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| invalid(server, "invalid port"))?;
                (host, port)
            }
            None => (server, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(invalid(server, "empty host"));
        }

        let mut addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| invalid(server, &e.to_string()))?;
        addrs
            .next()
            .ok_or_else(|| invalid(server, "host resolved to no addresses"))
    }
}

fn invalid(server: &str, reason: &str) -> OpError {
    OpError::InvalidAddress {
        server: server.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_addresses() {
        let resolver = Resolver::default();
        assert_eq!(
            resolver.resolve("127.0.0.1:8080").unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolver.resolve("10.0.0.7").unwrap(),
            "10.0.0.7:80".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolver.resolve("[::1]:443").unwrap(),
            "[::1]:443".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolver.resolve("[::1]").unwrap(),
            "[::1]:80".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_hostname_rejected_when_disabled() {
        let err = Resolver::new(false).resolve("backend.internal:8080").unwrap_err();
        assert!(matches!(err, OpError::InvalidAddress { .. }));
        assert!(matches!(
            Resolver::new(false).resolve("127.0.0.1:99999"),
            Err(OpError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_localhost_lookup() {
        let addr = Resolver::new(true).resolve("localhost:9000").unwrap();
        assert_eq!(addr.port(), 9000);
        assert!(addr.ip().is_loopback());

        assert!(matches!(
            Resolver::new(true).resolve("localhost:notaport"),
            Err(OpError::InvalidAddress { .. })
        ));
    }
}
