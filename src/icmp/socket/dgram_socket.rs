use super::TSocket;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::{io, time::Duration};

/// Datagram ICMP socket ("ping socket"). The kernel strips the IP header, rewrites the echo
/// identifier and only delivers replies addressed to this socket.
pub struct DgramSocket {
    socket: UdpSocket,
}

impl DgramSocket {
    pub(crate) fn new(socket: socket2::Socket) -> Self {
        tracing::trace!("creating DgramSocket");
        DgramSocket { socket: socket.into() }
    }
}

impl TSocket for DgramSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, IpAddr)> {
        self.socket.set_read_timeout(Some(timeout))?;
        let (n_bytes, addr) = self.socket.recv_from(buf)?;
        Ok((n_bytes, addr.ip()))
    }
}
