use std::{error::Error, fmt, io};

pub(crate) const PERMISSION_HINT: &str = "permission denied while opening the ICMP socket. \
    Allow unprivileged ICMP with `sudo sysctl -w net.ipv4.ping_group_range=\"0 2147483647\"` \
    or grant the binary CAP_NET_RAW with `sudo setcap cap_net_raw+ep <path-to-binary>`";

/// Classifies a [`PingError`].
///
/// Setup kinds are fatal and abort before any probe is sent. The remaining kinds describe a single
/// failed probe cycle; the pacing loop reports them and carries on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    Resolution,
    Permission,
    ConnectionSetup,
    TtlConfiguration,
    Serialization,
    Transmit,
    ReceiveTimeout,
    Receive,
    Parse,
    PayloadTooShort,
    Shutdown,
    Output,
}

impl ErrorKind {
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::Resolution | ErrorKind::Permission | ErrorKind::ConnectionSetup | ErrorKind::TtlConfiguration
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::Resolution => "could not resolve host",
            ErrorKind::Permission => "ICMP access denied",
            ErrorKind::ConnectionSetup => "could not open ICMP connection",
            ErrorKind::TtlConfiguration => "could not set TTL",
            ErrorKind::Serialization => "could not build echo request",
            ErrorKind::Transmit => "could not send echo request",
            ErrorKind::ReceiveTimeout => "request timed out",
            ErrorKind::Receive => "could not read from ICMP connection",
            ErrorKind::Parse => "could not parse ICMP message",
            ErrorKind::PayloadTooShort => "reply payload too short",
            ErrorKind::Shutdown => "session shutdown failed",
            ErrorKind::Output => "could not write output",
        };
        f.write_str(text)
    }
}

#[derive(Debug)]
pub struct PingError {
    kind: ErrorKind,
    message: String,
}

impl PingError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        PingError { kind, message: message.into() }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl Error for PingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

// Conversion used on the socket setup path.
impl From<io::Error> for PingError {
    fn from(error: io::Error) -> PingError {
        if error.kind() == io::ErrorKind::PermissionDenied {
            PingError::new(ErrorKind::Permission, PERMISSION_HINT)
        } else {
            PingError::new(ErrorKind::ConnectionSetup, error.to_string())
        }
    }
}
