use crate::endpoint::{ICMPV4_PROTOCOL, ICMPV6_PROTOCOL};
use crate::sequence_number::SequenceNumber;
use crate::{ErrorKind, PingError, PingResult};
use pnet_packet::icmp::{
    echo_reply::EchoReplyPacket,
    echo_request::{EchoRequestPacket, MutableEchoRequestPacket},
    IcmpCode, IcmpPacket, IcmpType, IcmpTypes,
};
use pnet_packet::icmpv6::{Icmpv6Packet, Icmpv6Type, Icmpv6Types};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::ipv6::Ipv6Packet;
use pnet_packet::Packet;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) const TIMESTAMP_SIZE: usize = 8;
/// Large enough for the ICMP message of either family plus a raw IPv4 header.
pub(crate) const RECEIVE_BUFFER_SIZE: usize = 1500;

// type + code + checksum
const ICMP_HEADER_SIZE: usize = 4;
// ICMP header + identifier + sequence number
const ECHO_HEADER_SIZE: usize = 8;
// ICMP header + unused, pointer or MTU field
const ERROR_HEADER_SIZE: usize = 8;
const IPV4_MIN_HEADER_SIZE: usize = 20;
const IPV6_HEADER_SIZE: usize = 40;

/// Echo request/reply type codes of one address family.
#[derive(Clone, Copy)]
struct EchoTypes {
    request: u8,
    reply: u8,
}

fn echo_types(is_v4: bool) -> EchoTypes {
    if is_v4 {
        EchoTypes { request: IcmpTypes::EchoRequest.0, reply: IcmpTypes::EchoReply.0 }
    } else {
        EchoTypes { request: Icmpv6Types::EchoRequest.0, reply: Icmpv6Types::EchoReply.0 }
    }
}

/// Message types that quote the offending datagram after their header.
fn is_error_type(is_v4: bool, icmp_type: u8) -> bool {
    if is_v4 {
        [IcmpTypes::DestinationUnreachable, IcmpTypes::TimeExceeded, IcmpTypes::ParameterProblem]
            .contains(&IcmpType::new(icmp_type))
    } else {
        [
            Icmpv6Types::DestinationUnreachable,
            Icmpv6Types::PacketTooBig,
            Icmpv6Types::TimeExceeded,
            Icmpv6Types::ParameterProblem,
        ]
        .contains(&Icmpv6Type::new(icmp_type))
    }
}

/// Offset of the quoted transport header inside an error message, if the quoted datagram is ICMP.
fn quoted_transport_offset(is_v4: bool, bytes: &[u8]) -> Option<usize> {
    let quote = bytes.get(ERROR_HEADER_SIZE..)?;
    let ip_header_len = if is_v4 {
        let ip = Ipv4Packet::new(quote)?;
        if ip.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
            return None;
        }
        Some(usize::from(ip.get_header_length()) * 4).filter(|&len| len >= IPV4_MIN_HEADER_SIZE)?
    } else {
        let ip = Ipv6Packet::new(quote)?;
        if ip.get_next_header() != IpNextHeaderProtocols::Icmpv6 {
            return None;
        }
        IPV6_HEADER_SIZE
    };
    Some(ERROR_HEADER_SIZE + ip_header_len)
}

pub(crate) fn encode_timestamp(nanos: i64) -> [u8; TIMESTAMP_SIZE] {
    nanos.to_le_bytes()
}

pub(crate) fn decode_timestamp(data: &[u8]) -> PingResult<i64> {
    let bytes: [u8; TIMESTAMP_SIZE] = data
        .get(..TIMESTAMP_SIZE)
        .and_then(|prefix| prefix.try_into().ok())
        .ok_or_else(|| {
            PingError::new(
                ErrorKind::PayloadTooShort,
                format!("{} bytes left for an {TIMESTAMP_SIZE} byte timestamp", data.len()),
            )
        })?;
    Ok(i64::from_le_bytes(bytes))
}

/// Wall-clock time in nanoseconds since the Unix epoch.
pub(crate) fn unix_nanos() -> PingResult<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| PingError::new(ErrorKind::Serialization, format!("system clock before Unix epoch: {e}")))?;
    i64::try_from(elapsed.as_nanos())
        .map_err(|_| PingError::new(ErrorKind::Serialization, "timestamp does not fit into 64 bits"))
}

/// Builds an echo request. ICMPv4 and ICMPv6 echo messages share one layout; only the type code and
/// the checksum differ. The ICMPv6 checksum covers a pseudo header and is filled in by the kernel.
pub(crate) fn new_echo_request(
    is_v4: bool,
    identifier: u16,
    sequence_number: SequenceNumber,
    payload: &[u8],
) -> PingResult<MutableEchoRequestPacket<'static>> {
    let buf = vec![0u8; EchoRequestPacket::minimum_packet_size() + payload.len()];
    let mut package = MutableEchoRequestPacket::owned(buf)
        .ok_or_else(|| PingError::new(ErrorKind::Serialization, "buffer too small for echo request"))?;
    package.set_icmp_type(IcmpType::new(echo_types(is_v4).request));
    package.set_icmp_code(IcmpCode::new(0));
    package.set_identifier(identifier);
    package.set_sequence_number(sequence_number.into());
    package.set_payload(payload);

    package.set_checksum(0_u16);
    if is_v4 {
        let icmp_packet = IcmpPacket::new(package.packet())
            .ok_or_else(|| PingError::new(ErrorKind::Serialization, "could not view echo request as ICMP packet"))?;
        let checksum = pnet_packet::icmp::checksum(&icmp_packet);
        package.set_checksum(checksum);
    }
    Ok(package)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MessageKind {
    EchoReply { identifier: u16, sequence_number: SequenceNumber },
    EchoRequest,
    /// An error message such as Time Exceeded, quoting an echo request.
    Error { icmp_type: u8, identifier: u16, sequence_number: SequenceNumber },
    /// Anything else, including error messages about other traffic.
    Other(u8),
}

/// A received ICMP or ICMPv6 message, without IP header.
#[derive(Debug)]
pub(crate) struct IcmpMessage<'a> {
    kind: MessageKind,
    bytes: &'a [u8],
    // Where the echo payload starts; for error messages inside the quoted request.
    payload_offset: Option<usize>,
}

impl<'a> IcmpMessage<'a> {
    pub(crate) fn parse(protocol_number: u8, bytes: &'a [u8]) -> PingResult<Self> {
        let icmp_type = match protocol_number {
            ICMPV4_PROTOCOL => IcmpPacket::new(bytes).map(|packet| packet.get_icmp_type().0),
            ICMPV6_PROTOCOL => Icmpv6Packet::new(bytes).map(|packet| packet.get_icmpv6_type().0),
            other => return Err(PingError::new(ErrorKind::Parse, format!("unsupported protocol number {other}"))),
        }
        .ok_or_else(|| {
            PingError::new(ErrorKind::Parse, format!("{} bytes are too short for an ICMP header", bytes.len()))
        })?;

        let is_v4 = protocol_number == ICMPV4_PROTOCOL;
        let types = echo_types(is_v4);
        if icmp_type == types.reply || icmp_type == types.request {
            let echo = EchoReplyPacket::new(bytes).ok_or_else(|| {
                PingError::new(ErrorKind::Parse, format!("truncated echo message of {} bytes", bytes.len()))
            })?;
            let kind = if icmp_type == types.reply {
                MessageKind::EchoReply {
                    identifier: echo.get_identifier(),
                    sequence_number: echo.get_sequence_number().into(),
                }
            } else {
                MessageKind::EchoRequest
            };
            return Ok(IcmpMessage { kind, bytes, payload_offset: Some(ECHO_HEADER_SIZE) });
        }

        if is_error_type(is_v4, icmp_type) {
            let quoted_echo = quoted_transport_offset(is_v4, bytes).and_then(|offset| {
                let echo = EchoRequestPacket::new(bytes.get(offset..)?)?;
                (echo.get_icmp_type().0 == types.request).then_some((offset, echo))
            });
            if let Some((offset, echo)) = quoted_echo {
                let kind = MessageKind::Error {
                    icmp_type,
                    identifier: echo.get_identifier(),
                    sequence_number: echo.get_sequence_number().into(),
                };
                return Ok(IcmpMessage { kind, bytes, payload_offset: Some(offset + ECHO_HEADER_SIZE) });
            }
        }
        Ok(IcmpMessage { kind: MessageKind::Other(icmp_type), bytes, payload_offset: None })
    }

    pub(crate) fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Length of the message body following type, code and checksum.
    pub(crate) fn body_len(&self) -> usize {
        self.bytes.len().saturating_sub(ICMP_HEADER_SIZE)
    }

    /// The send timestamp embedded in the first data bytes after the (possibly quoted) echo header.
    pub(crate) fn timestamp(&self) -> PingResult<i64> {
        let offset = self
            .payload_offset
            .ok_or_else(|| PingError::new(ErrorKind::Parse, format!("{:?} carries no echo payload", self.kind)))?;
        decode_timestamp(self.bytes.get(offset..).unwrap_or_default())
    }
}
