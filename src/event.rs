use crate::{PingError, ProbeResult};
use std::sync::mpsc;

/// What one pacing loop iteration produced.
#[derive(Debug)]
pub enum ProbeOutcome {
    Result(ProbeResult),
    Error(PingError),
    /// The configured number of probes has been sent. Nothing follows.
    Exhausted,
}

/// Everything the coordinator waits on.
#[derive(Debug)]
pub enum Event {
    Probe(ProbeOutcome),
    /// External cancellation, e.g. Ctrl+C.
    Interrupt,
}

pub type EventSender = mpsc::SyncSender<Event>;
pub type EventReceiver = mpsc::Receiver<Event>;

#[must_use]
pub fn event_channel(channel_size: usize) -> (EventSender, EventReceiver) {
    mpsc::sync_channel::<Event>(channel_size)
}
