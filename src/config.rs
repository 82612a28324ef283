use crate::Ttl;
use std::time::Duration;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Kind of ICMP socket the session opens.
///
/// `Dgram` works without privileges where the kernel allows unprivileged ICMP
/// (`net.ipv4.ping_group_range` on Linux). `Raw` requires root or `CAP_NET_RAW`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SocketType {
    #[default]
    Dgram,
    Raw,
}

/// Which resolved address of a hostname is probed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FamilyPreference {
    /// First IPv4 address, falling back to the first IPv6 address.
    #[default]
    PreferV4,
    V4Only,
    V6Only,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeConfig {
    pub ttl: Option<Ttl>,
    /// Number of probe cycles. `None` runs until cancelled.
    pub count: Option<u32>,
    pub socket_type: SocketType,
    pub family: FamilyPreference,
    pub interval: Duration,
    pub receive_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            ttl: None,
            count: None,
            socket_type: SocketType::default(),
            family: FamilyPreference::default(),
            interval: DEFAULT_INTERVAL,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }
}

impl ProbeConfig {
    /// A TTL of 0 leaves the system default in place.
    #[must_use]
    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = Ttl::non_zero(ttl);
        self
    }

    /// A count of 0 probes until cancelled.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = (count != 0).then_some(count);
        self
    }

    #[must_use]
    pub fn with_socket_type(mut self, socket_type: SocketType) -> Self {
        self.socket_type = socket_type;
        self
    }

    #[must_use]
    pub fn with_family(mut self, family: FamilyPreference) -> Self {
        self.family = family;
        self
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_receive_timeout(mut self, receive_timeout: Duration) -> Self {
        self.receive_timeout = receive_timeout;
        self
    }
}
