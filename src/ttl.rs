/// IP time to live (IPv4) or unicast hop limit (IPv6) applied to the probe socket.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Ttl(pub u8);

impl Ttl {
    /// Zero means "leave the system default", so it maps to `None`.
    #[must_use]
    pub fn non_zero(value: u8) -> Option<Ttl> {
        (value != 0).then_some(Ttl(value))
    }
}

impl From<u8> for Ttl {
    fn from(integer: u8) -> Self {
        Ttl(integer)
    }
}

impl From<Ttl> for u8 {
    fn from(ttl: Ttl) -> Self {
        ttl.0
    }
}

impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        u32::from(ttl.0)
    }
}

impl std::fmt::Display for Ttl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
