use crate::{Endpoint, ErrorKind, PingError, PingResult, SocketType, Ttl};
use socket2::{Domain, Protocol, Type};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub use dgram_socket::DgramSocket;
pub use raw_socket::RawSocket;

pub(crate) mod dgram_socket;
pub(crate) mod raw_socket;

/// Transport of ICMP messages. Implementations return messages without IP header.
pub trait TSocket: Send + Sync {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize>;

    /// Blocks for at most `timeout`. An expired timeout surfaces as `WouldBlock` or `TimedOut`.
    fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, IpAddr)>;
}

pub enum Socket {
    Raw(RawSocket),
    Dgram(DgramSocket),
}

impl Socket {
    /// Opens an ICMP socket for the endpoint's family bound to the wildcard address.
    pub(crate) fn new(socket_type: SocketType, endpoint: &Endpoint, ttl: Option<Ttl>) -> PingResult<Self> {
        let (domain, protocol) =
            if endpoint.is_v4 { (Domain::IPV4, Protocol::ICMPV4) } else { (Domain::IPV6, Protocol::ICMPV6) };
        let ty = match socket_type {
            SocketType::Dgram => Type::DGRAM,
            SocketType::Raw => Type::RAW,
        };
        tracing::trace!(?socket_type, ipv4 = endpoint.is_v4, "creating ICMP socket");
        let socket = socket2::Socket::new(domain, ty, Some(protocol))?;
        socket.bind(&SocketAddr::new(endpoint.wildcard(), 0).into())?;

        if let Some(ttl) = ttl {
            let applied = if endpoint.is_v4 {
                socket.set_ttl(ttl.into())
            } else {
                socket.set_unicast_hops_v6(ttl.into())
            };
            applied.map_err(|e| PingError::new(ErrorKind::TtlConfiguration, format!("TTL {ttl}: {e}")))?;
            tracing::trace!(%ttl, "TTL applied");
        }

        Ok(match socket_type {
            SocketType::Dgram => Socket::Dgram(DgramSocket::new(socket)),
            SocketType::Raw => Socket::Raw(RawSocket::new(socket, endpoint.is_v4)),
        })
    }
}

impl TSocket for Socket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        match self {
            Socket::Dgram(socket) => socket.send_to(buf, addr),
            Socket::Raw(socket) => socket.send_to(buf, addr),
        }
    }

    fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, IpAddr)> {
        match self {
            Socket::Dgram(socket) => socket.recv_from(buf, timeout),
            Socket::Raw(socket) => socket.recv_from(buf, timeout),
        }
    }
}
