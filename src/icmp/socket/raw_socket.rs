use super::TSocket;
use pnet_packet::ipv4::Ipv4Packet;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::{io, time::Duration};

/// Raw ICMP socket. Sees every ICMP message arriving at the host, including replies meant for other
/// processes.
pub struct RawSocket {
    socket: UdpSocket,
    // Raw IPv4 sockets deliver the IP header, raw IPv6 sockets do not.
    strip_ipv4_header: bool,
}

impl RawSocket {
    pub(crate) fn new(socket: socket2::Socket, is_v4: bool) -> Self {
        tracing::trace!("creating RawSocket");
        RawSocket { socket: socket.into(), strip_ipv4_header: is_v4 }
    }
}

impl TSocket for RawSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<(usize, IpAddr)> {
        self.socket.set_read_timeout(Some(timeout))?;
        let (n_bytes, addr) = self.socket.recv_from(buf)?;
        if !self.strip_ipv4_header {
            return Ok((n_bytes, addr.ip()));
        }

        let header_len = Ipv4Packet::new(&buf[..n_bytes])
            .map(|ipv4_packet| usize::from(ipv4_packet.get_header_length()) * 4)
            .filter(|&header_len| header_len <= n_bytes)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "truncated IPv4 header"))?;
        // Return only the ICMP content
        buf.copy_within(header_len..n_bytes, 0);
        Ok((n_bytes - header_len, addr.ip()))
    }
}
