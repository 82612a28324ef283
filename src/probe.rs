use crate::icmp::echo::{self, IcmpMessage, MessageKind, RECEIVE_BUFFER_SIZE};
use crate::icmp::TSocket;
use crate::sequence_number::SequenceNumber;
use crate::{Endpoint, ErrorKind, PingError, PingResult, ProbeConfig, ProbeResult, SocketType, Ttl};
use pnet_packet::Packet;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Runs single probe cycles: one echo request out, one classified reply back.
pub(crate) struct Prober<S> {
    socket: Arc<S>,
    endpoint: Endpoint,
    identifier: u16,
    ttl: Option<Ttl>,
    // Datagram sockets rewrite the identifier and filter replies in the kernel.
    check_identifier: bool,
    receive_timeout: Duration,
}

impl<S> Prober<S>
where
    S: TSocket + 'static,
{
    pub(crate) fn new(socket: Arc<S>, endpoint: Endpoint, config: &ProbeConfig) -> Self {
        Prober {
            socket,
            endpoint,
            // Drawn once; every request of the session carries it.
            identifier: rand::random::<u16>(),
            ttl: config.ttl,
            check_identifier: config.socket_type == SocketType::Raw,
            receive_timeout: config.receive_timeout,
        }
    }

    pub(crate) fn probe(&self, sequence_number: SequenceNumber) -> PingResult<ProbeResult> {
        // (1) Send echo request carrying the send time.
        let payload = echo::encode_timestamp(echo::unix_nanos()?);
        let request = echo::new_echo_request(self.endpoint.is_v4, self.identifier, sequence_number, &payload)?;
        self.socket
            .send_to(request.packet(), SocketAddr::new(self.endpoint.address, 0))
            .map_err(|e| PingError::new(ErrorKind::Transmit, e.to_string()))?;
        tracing::trace!(seq = u16::from(sequence_number), "echo request sent");

        // (2) Read until the matching reply shows up or the deadline passes.
        let deadline = Instant::now() + self.receive_timeout;
        let mut buf = [0u8; RECEIVE_BUFFER_SIZE];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timeout_error());
            }
            let (n_bytes, peer) = self.socket.recv_from(&mut buf, remaining).map_err(|e| self.receive_error(&e))?;
            let received_at = echo::unix_nanos()?;

            let message = IcmpMessage::parse(self.endpoint.protocol_number, &buf[..n_bytes])?;
            let (identifier, seq, answered) = match message.kind() {
                MessageKind::EchoRequest => {
                    tracing::trace!("discarding looped-back echo request");
                    continue;
                }
                MessageKind::Other(icmp_type) => {
                    tracing::trace!(icmp_type, %peer, "discarding message unrelated to our requests");
                    continue;
                }
                MessageKind::EchoReply { identifier, sequence_number: seq } => (identifier, seq, true),
                MessageKind::Error { icmp_type, identifier, sequence_number: seq } => {
                    tracing::debug!(icmp_type, %peer, "received error message quoting an echo request");
                    (identifier, seq, false)
                }
            };
            if self.check_identifier && identifier != self.identifier {
                tracing::trace!(identifier, "discarding message meant for another process");
                continue;
            }
            if seq != sequence_number {
                tracing::debug!(seq = u16::from(seq), "discarding message of an earlier probe");
                continue;
            }

            // (3) Compute RTT from the embedded send time.
            let sent_at = message.timestamp()?;
            #[allow(clippy::cast_precision_loss)]
            let round_trip_millis = received_at.saturating_sub(sent_at) as f64 / NANOS_PER_MILLI;
            tracing::trace!(round_trip_millis, answered, "echo reply received");
            return Ok(ProbeResult {
                peer_host: peer.to_string(),
                byte_length: message.body_len(),
                ttl: self.ttl,
                round_trip_millis,
                answered,
                sequence_number: sequence_number.into(),
            });
        }
    }

    fn timeout_error(&self) -> PingError {
        PingError::new(ErrorKind::ReceiveTimeout, format!("no reply within {:?}", self.receive_timeout))
    }

    fn receive_error(&self, error: &io::Error) -> PingError {
        match error.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => self.timeout_error(),
            _ => PingError::new(ErrorKind::Receive, error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icmp::socket::tests::{echo_reply_of, time_exceeded_of, OnReceive, OnSend, SocketMock, ROUTER};
    use crate::{FamilyPreference, ProbeConfig};
    use more_asserts as ma;
    use pnet_packet::icmp::IcmpTypes;
    use std::net::IpAddr;

    fn localhost() -> Endpoint {
        crate::endpoint::resolve("127.0.0.1", FamilyPreference::PreferV4).unwrap()
    }

    fn prober(socket: &SocketMock, config: &ProbeConfig) -> Prober<SocketMock> {
        Prober::new(Arc::new(socket.clone()), localhost(), config)
    }

    #[test]
    fn echo_reply_is_answered() {
        let socket = SocketMock::new_default();
        let prober = prober(&socket, &ProbeConfig::default().with_ttl(64));

        let result = prober.probe(SequenceNumber::start_value()).unwrap();

        assert!(result.answered);
        assert_eq!("127.0.0.1", result.peer_host);
        assert_eq!(12, result.byte_length);
        assert_eq!(Some(Ttl(64)), result.ttl);
        assert_eq!(1, result.sequence_number);
        assert!(result.round_trip_millis >= 0.0);
        socket
            .should_send_number_of_messages(1)
            .should_send_to_address(&IpAddr::from([127, 0, 0, 1]))
            .should_receive_number_of_messages(1);
    }

    #[test]
    fn request_carries_sequence_number_and_timestamp() {
        let socket = SocketMock::new_default();
        let prober = prober(&socket, &ProbeConfig::default());
        let before = echo::unix_nanos().unwrap();

        prober.probe(SequenceNumber::from(42)).unwrap();

        let sent = socket.sent_messages();
        assert_eq!(IcmpTypes::EchoRequest.0, sent[0][0]);
        assert_eq!([0, 42], sent[0][6..8]);
        let timestamp = echo::decode_timestamp(&sent[0][8..]).unwrap();
        assert!(timestamp >= before);
    }

    #[test]
    fn no_reply_is_receive_timeout() {
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::Timeout]);
        let error = prober(&socket, &ProbeConfig::default()).probe(SequenceNumber::start_value()).unwrap_err();
        assert_eq!(ErrorKind::ReceiveTimeout, error.kind());
    }

    #[test]
    fn failed_send_is_transmit_error() {
        let socket = SocketMock::new(OnSend::ReturnErr, vec![OnReceive::Echo]);
        let error = prober(&socket, &ProbeConfig::default()).probe(SequenceNumber::start_value()).unwrap_err();
        assert_eq!(ErrorKind::Transmit, error.kind());
        socket.should_receive_number_of_messages(0);
    }

    #[test]
    fn late_reply_of_earlier_probe_is_discarded() {
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::Late, OnReceive::Echo]);
        let prober = prober(&socket, &ProbeConfig::default());

        let first = prober.probe(SequenceNumber::from(1)).unwrap_err();
        let second = prober.probe(SequenceNumber::from(2)).unwrap();

        assert_eq!(ErrorKind::ReceiveTimeout, first.kind());
        assert!(second.answered);
        assert_eq!(2, second.sequence_number);
        socket.should_receive_number_of_messages(2);
    }

    #[test]
    fn looped_back_request_is_skipped() {
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::LoopbackThenEcho]);
        let result = prober(&socket, &ProbeConfig::default()).probe(SequenceNumber::start_value()).unwrap();
        assert!(result.answered);
        socket.should_receive_number_of_messages(2);
    }

    #[test]
    fn foreign_identifier_is_skipped_on_raw_sockets() {
        let foreign =
            echo::new_echo_request(true, 0x0101, SequenceNumber::start_value(), &echo::encode_timestamp(1)).unwrap();
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::Message(echo_reply_of(foreign.packet()))]);
        let config = ProbeConfig::default().with_socket_type(SocketType::Raw);
        let prober = Prober { identifier: 0x0202, ..prober(&socket, &config) };

        let error = prober.probe(SequenceNumber::start_value()).unwrap_err();

        assert_eq!(ErrorKind::ReceiveTimeout, error.kind());
        socket.should_receive_number_of_messages(1);
    }

    fn raw_prober(socket: &SocketMock) -> Prober<SocketMock> {
        prober(socket, &ProbeConfig::default().with_socket_type(SocketType::Raw))
    }

    #[test]
    fn time_exceeded_is_unanswered_with_rtt_of_quoted_request() {
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::TimeExceeded]);

        let result = raw_prober(&socket).probe(SequenceNumber::start_value()).unwrap();

        assert!(!result.answered);
        assert_eq!(ROUTER.to_string(), result.peer_host);
        assert_eq!(1, result.sequence_number);
        ma::assert_ge!(result.round_trip_millis, 0.0);
        ma::assert_lt!(result.round_trip_millis, 5000.0);
    }

    #[test]
    fn time_exceeded_without_quoted_timestamp_is_payload_too_short() {
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::TimeExceededHeaderOnly]);
        let error = raw_prober(&socket).probe(SequenceNumber::start_value()).unwrap_err();
        assert_eq!(ErrorKind::PayloadTooShort, error.kind());
    }

    #[test]
    fn time_exceeded_for_foreign_request_is_skipped_on_raw_sockets() {
        let foreign =
            echo::new_echo_request(true, 0x0101, SequenceNumber::start_value(), &echo::encode_timestamp(1)).unwrap();
        let socket =
            SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::Message(time_exceeded_of(foreign.packet()))]);
        let prober = Prober { identifier: 0x0202, ..raw_prober(&socket) };

        let error = prober.probe(SequenceNumber::start_value()).unwrap_err();

        assert_eq!(ErrorKind::ReceiveTimeout, error.kind());
    }

    #[test]
    fn time_exceeded_for_earlier_probe_is_skipped() {
        let earlier =
            echo::new_echo_request(true, 0x0303, SequenceNumber::from(7), &echo::encode_timestamp(1)).unwrap();
        let socket =
            SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::Message(time_exceeded_of(earlier.packet()))]);
        let prober = Prober { identifier: 0x0303, ..raw_prober(&socket) };

        let error = prober.probe(SequenceNumber::from(8)).unwrap_err();

        assert_eq!(ErrorKind::ReceiveTimeout, error.kind());
    }

    #[test]
    fn unrelated_message_is_skipped() {
        // destination unreachable without a quoted echo request
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::Message(vec![3, 1, 0, 0, 0, 0, 0, 0])]);
        let error = raw_prober(&socket).probe(SequenceNumber::start_value()).unwrap_err();
        assert_eq!(ErrorKind::ReceiveTimeout, error.kind());
        socket.should_receive_number_of_messages(1);
    }

    #[test]
    fn v6_time_exceeded_is_unanswered() {
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::TimeExceeded]);
        let endpoint = crate::endpoint::resolve("::1", FamilyPreference::PreferV4).unwrap();
        let config = ProbeConfig::default().with_socket_type(SocketType::Raw);
        let prober = Prober::new(Arc::new(socket.clone()), endpoint, &config);

        let result = prober.probe(SequenceNumber::start_value()).unwrap();

        assert!(!result.answered);
        ma::assert_lt!(result.round_trip_millis, 5000.0);
    }

    #[test]
    fn identifier_is_stable_across_cycles() {
        let socket = SocketMock::new_default();
        let prober = prober(&socket, &ProbeConfig::default());

        prober.probe(SequenceNumber::from(1)).unwrap();
        prober.probe(SequenceNumber::from(2)).unwrap();

        let sent = socket.sent_messages();
        assert_eq!(sent[0][4..6], sent[1][4..6]);
        assert_eq!(prober.identifier.to_be_bytes(), sent[0][4..6]);
    }

    #[test]
    fn garbage_is_parse_error() {
        let socket = SocketMock::new(OnSend::ReturnDefault, vec![OnReceive::Message(vec![0xFF])]);
        let error = prober(&socket, &ProbeConfig::default()).probe(SequenceNumber::start_value()).unwrap_err();
        assert_eq!(ErrorKind::Parse, error.kind());
    }

    #[test]
    fn v6_echo_reply_is_answered() {
        let socket = SocketMock::new_default();
        let endpoint = crate::endpoint::resolve("::1", FamilyPreference::PreferV4).unwrap();
        let prober = Prober::new(Arc::new(socket.clone()), endpoint, &ProbeConfig::default());

        let result = prober.probe(SequenceNumber::start_value()).unwrap();

        assert!(result.answered);
        assert_eq!("::1", result.peer_host);
    }
}
