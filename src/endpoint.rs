use crate::{ErrorKind, FamilyPreference, PingError, PingResult};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

pub const ICMPV4_PROTOCOL: u8 = 1;
pub const ICMPV6_PROTOCOL: u8 = 58;

/// The resolved probe target.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Endpoint {
    pub address: IpAddr,
    pub is_v4: bool,
    /// IANA protocol number used to parse incoming messages: 1 for ICMP, 58 for ICMPv6.
    pub protocol_number: u8,
}

impl Endpoint {
    #[must_use]
    pub fn new(address: IpAddr) -> Self {
        let is_v4 = address.is_ipv4();
        Endpoint { address, is_v4, protocol_number: if is_v4 { ICMPV4_PROTOCOL } else { ICMPV6_PROTOCOL } }
    }

    /// Wildcard address of the endpoint's family, used as the local bind address.
    #[must_use]
    pub fn wildcard(&self) -> IpAddr {
        if self.is_v4 {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        }
    }
}

/// Resolves `host` into an [`Endpoint`].
///
/// IP literals are used as they are. Hostnames are looked up and one address is picked according to
/// `preference`, independent of the order the system resolver returns.
pub fn resolve(host: &str, preference: FamilyPreference) -> PingResult<Endpoint> {
    if let Ok(address) = host.parse::<IpAddr>() {
        return select_address(&[address], preference).map(Endpoint::new).ok_or_else(|| {
            PingError::new(ErrorKind::Resolution, format!("{host} does not match the requested address family"))
        });
    }

    let addresses = dns_lookup::lookup_host(host)
        .map_err(|e| PingError::new(ErrorKind::Resolution, format!("could not resolve host {host}: {e}")))?;
    tracing::debug!(host, candidates = addresses.len(), "host looked up");

    let address = select_address(&addresses, preference).ok_or_else(|| {
        PingError::new(ErrorKind::Resolution, format!("no usable address for host {host} ({preference:?})"))
    })?;
    Ok(Endpoint::new(address))
}

pub(crate) fn select_address(candidates: &[IpAddr], preference: FamilyPreference) -> Option<IpAddr> {
    let first_v4 = || candidates.iter().copied().find(IpAddr::is_ipv4);
    let first_v6 = || candidates.iter().copied().find(IpAddr::is_ipv6);
    match preference {
        FamilyPreference::PreferV4 => first_v4().or_else(first_v6),
        FamilyPreference::V4Only => first_v4(),
        FamilyPreference::V6Only => first_v6(),
    }
}
