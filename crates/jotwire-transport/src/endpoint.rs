use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// An IPv4 address and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    addr: Ipv4Addr,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint from its four address octets and a port.
    pub const fn new(octets: [u8; 4], port: u16) -> Self {
        Self {
            addr: Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]),
            port,
        }
    }

    /// The loopback endpoint for `port`. The server only ever binds here.
    pub const fn localhost(port: u16) -> Self {
        Self::new([127, 0, 0, 1], port)
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.addr, self.port))
    }

    /// Convert an OS-reported address. IPv6 peers are not representable.
    pub fn from_socket_addr(addr: SocketAddr) -> Option<Self> {
        match addr {
            SocketAddr::V4(v4) => Some(Self {
                addr: *v4.ip(),
                port: v4.port(),
            }),
            SocketAddr::V6(_) => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_is_loopback() {
        let endpoint = Endpoint::localhost(2016);
        assert!(endpoint.addr().is_loopback());
        assert_eq!(endpoint.port(), 2016);
        assert_eq!(endpoint.to_string(), "127.0.0.1:2016");
    }

    #[test]
    fn socket_addr_roundtrip() {
        let endpoint = Endpoint::new([10, 0, 0, 7], 9000);
        let back = Endpoint::from_socket_addr(endpoint.socket_addr()).unwrap();
        assert_eq!(back, endpoint);
    }

    #[test]
    fn ipv6_addresses_are_rejected() {
        let addr: SocketAddr = "[::1]:80".parse().unwrap();
        assert!(Endpoint::from_socket_addr(addr).is_none());
    }
}
