use crate::event::{Event, EventReceiver, ProbeOutcome};
use crate::icmp::{Socket, TSocket};
use crate::{ErrorKind, PingError, PingResult, Session, SessionStats};
use std::io::Write;

/// Consumes the events of a running session, prints them and produces the final report.
pub struct Coordinator<S = Socket>
where
    S: TSocket + 'static,
{
    session: Session<S>,
    event_rx: EventReceiver,
}

impl<S> Coordinator<S>
where
    S: TSocket + 'static,
{
    pub fn new(session: Session<S>, event_rx: EventReceiver) -> Self {
        Coordinator { session, event_rx }
    }

    /// Runs until the attempt budget is spent, an interrupt arrives or every event sender is gone.
    /// Always stops the session and writes the report before returning.
    pub fn run<W: Write>(self, out: &mut W) -> PingResult<SessionStats> {
        let Coordinator { mut session, event_rx } = self;
        let mut stats = SessionStats::new();

        writeln!(out, "Pinging {}:", session.endpoint().address).map_err(output_error)?;
        loop {
            match event_rx.recv() {
                Ok(Event::Probe(ProbeOutcome::Result(result))) => {
                    writeln!(out, "{result}").map_err(output_error)?;
                    stats.push(result);
                }
                Ok(Event::Probe(ProbeOutcome::Error(e))) => {
                    writeln!(out, "{e}").map_err(output_error)?;
                    stats.record_error();
                }
                Ok(Event::Probe(ProbeOutcome::Exhausted)) => {
                    tracing::debug!("probe budget spent");
                    break;
                }
                Ok(Event::Interrupt) => {
                    tracing::debug!("interrupted");
                    break;
                }
                Err(_) => {
                    tracing::debug!("all event senders gone");
                    break;
                }
            }
        }

        // Unblocks a pacing loop waiting on a full channel.
        drop(event_rx);
        if let Err(e) = session.stop() {
            tracing::warn!("{e}");
        }

        writeln!(out).map_err(output_error)?;
        writeln!(out, "{stats}").map_err(output_error)?;
        out.flush().map_err(output_error)?;
        Ok(stats)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn output_error(error: std::io::Error) -> PingError {
    PingError::new(ErrorKind::Output, error.to_string())
}
