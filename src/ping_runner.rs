use crate::event::{Event, EventSender, ProbeOutcome};
use crate::icmp::TSocket;
use crate::probe::Prober;
use crate::sequence_number::SequenceNumber;
use crate::stop_condition::StopCondition;
use std::io;
use std::sync::mpsc::TrySendError;
use std::thread::JoinHandle;
use std::time::Duration;

// How often a send into a full event channel re-checks for a stop.
const SEND_RETRY_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) struct PacingConfig {
    pub count: Option<u32>,
    pub interval: Duration,
}

pub(crate) fn start_pacing_thread<S>(
    prober: Prober<S>,
    config: PacingConfig,
    stop_condition: StopCondition,
    event_tx: EventSender,
) -> io::Result<JoinHandle<()>>
where
    S: TSocket + 'static,
{
    std::thread::Builder::new()
        .name("pacing-loop".to_owned())
        .spawn(move || run_pacing_loop(&prober, &config, &stop_condition, &event_tx))
}

/// Probes until the attempt limit is reached, a stop is requested or nobody listens anymore.
pub(crate) fn run_pacing_loop<S>(
    prober: &Prober<S>,
    config: &PacingConfig,
    stop_condition: &StopCondition,
    event_tx: &EventSender,
) where
    S: TSocket + 'static,
{
    tracing::trace!(count = ?config.count, "pacing loop start");
    let mut sequence_number = SequenceNumber::start_value();
    let mut attempts: u32 = 0;
    loop {
        // (1) Check termination.
        if stop_condition.get_should_stop() {
            break;
        }
        if config.count.map_or(false, |count| attempts >= count) {
            if !dispatch(event_tx, stop_condition, Event::Probe(ProbeOutcome::Exhausted)) {
                tracing::debug!("exhaustion not reported");
            }
            break;
        }

        // (2) Run one probe cycle.
        let outcome = match prober.probe(sequence_number) {
            Ok(result) => ProbeOutcome::Result(result),
            // The session is shutting down; a failure now is part of the teardown.
            Err(_) if stop_condition.get_should_stop() => break,
            Err(e) => ProbeOutcome::Error(e),
        };
        attempts += 1;
        sequence_number = sequence_number.next();

        // (3) Dispatch outcome.
        if !dispatch(event_tx, stop_condition, Event::Probe(outcome)) {
            tracing::debug!("event receiver gone or stop requested");
            break;
        }

        // (4) Sleep until the next cycle.
        if stop_condition.wait_timeout(config.interval) {
            break;
        }
    }
    tracing::trace!(attempts, "pacing loop end");
}

/// Sends `event`, waiting while the channel is full. Gives up when the receiver is gone or a stop is
/// requested, so a stalled receiver cannot keep the loop from ending.
fn dispatch(event_tx: &EventSender, stop_condition: &StopCondition, mut event: Event) -> bool {
    loop {
        match event_tx.try_send(event) {
            Ok(()) => return true,
            Err(TrySendError::Disconnected(_)) => return false,
            Err(TrySendError::Full(returned)) => {
                if stop_condition.wait_timeout(SEND_RETRY_INTERVAL) {
                    return false;
                }
                event = returned;
            }
        }
    }
}
