use crate::Ttl;
use std::fmt;

/// Outcome of one completed probe cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeResult {
    pub peer_host: String,
    /// Length of the ICMP message body of the reply.
    pub byte_length: usize,
    /// The TTL configured for the session, if any.
    pub ttl: Option<Ttl>,
    pub round_trip_millis: f64,
    /// `false` when the reply was a message other than an echo reply.
    pub answered: bool,
    pub sequence_number: u16,
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reply from {}: bytes={}, time={:.2}", self.peer_host, self.byte_length, self.round_trip_millis)?;
        match self.ttl {
            Some(ttl) if ttl.0 != 0 => write!(f, ", ttl={ttl}"),
            _ => Ok(()),
        }
    }
}
