#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

//! ICMP echo probing of a single host.
//!
//! [`Session::open`] resolves the host and opens the ICMP connection, [`Session::start`] spawns the
//! pacing loop and [`Coordinator::run`] consumes its events until the probe budget is spent or an
//! [`Event::Interrupt`] arrives, then prints the [`SessionStats`] report.

pub use config::{FamilyPreference, ProbeConfig, SocketType};
pub use coordinator::Coordinator;
pub use endpoint::{resolve, Endpoint, ICMPV4_PROTOCOL, ICMPV6_PROTOCOL};
pub use event::{event_channel, Event, EventReceiver, EventSender, ProbeOutcome};
pub use ping_error::{ErrorKind, PingError};
pub use ping_result::PingResult;
pub use probe_result::ProbeResult;
pub use session::{Session, State};
pub use stats::{SessionStats, Summary};
pub use ttl::Ttl;

mod config;
mod coordinator;
mod endpoint;
mod event;
mod icmp;
mod ping_error;
mod ping_result;
mod ping_runner;
mod probe;
mod probe_result;
mod sequence_number;
mod session;
mod stats;
mod stop_condition;
mod ttl;
