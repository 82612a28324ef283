use crate::event::EventSender;
use crate::icmp::{Socket, TSocket};
use crate::ping_runner::{start_pacing_thread, PacingConfig};
use crate::probe::Prober;
use crate::stop_condition::StopCondition;
use crate::{endpoint, Endpoint, ErrorKind, PingError, PingResult, ProbeConfig};
use std::sync::Arc;
use std::thread::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Ready,
    Running,
    Stopped,
}

/// One probe run against one endpoint over one ICMP connection.
///
/// The connection is closed exactly once, by [`Session::stop`] or on drop, after the pacing loop has
/// been told to stop and has finished.
pub struct Session<S = Socket>
where
    S: TSocket + 'static,
{
    endpoint: Endpoint,
    config: ProbeConfig,
    socket: Option<Arc<S>>,
    stop_condition: StopCondition,
    pacing_thread: Option<JoinHandle<()>>,
    state: State,
}

impl Session<Socket> {
    /// Resolves `host` and opens the ICMP connection. All setup failures are reported here.
    pub fn open(host: &str, config: ProbeConfig) -> PingResult<Self> {
        let endpoint = endpoint::resolve(host, config.family)?;
        let socket = Socket::new(config.socket_type, &endpoint, config.ttl)?;
        tracing::debug!(address = %endpoint.address, "session opened");
        Ok(Self::with_socket(endpoint, config, socket))
    }
}

impl<S> Session<S>
where
    S: TSocket + 'static,
{
    pub(crate) fn with_socket(endpoint: Endpoint, config: ProbeConfig, socket: S) -> Self {
        Session {
            endpoint,
            config,
            socket: Some(Arc::new(socket)),
            stop_condition: StopCondition::new(),
            pacing_thread: None,
            state: State::Ready,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Starts the pacing loop. Outcomes are sent to `event_tx`.
    pub fn start(&mut self, event_tx: EventSender) -> PingResult<()> {
        let socket = match (self.state, &self.socket) {
            (State::Ready, Some(socket)) => socket.clone(),
            (state, _) => {
                return Err(PingError::new(ErrorKind::Shutdown, format!("cannot start a session in state {state:?}")))
            }
        };
        let prober = Prober::new(socket, self.endpoint, &self.config);
        let pacing_config = PacingConfig { count: self.config.count, interval: self.config.interval };
        let handle = start_pacing_thread(prober, pacing_config, self.stop_condition.clone(), event_tx)
            .map_err(|e| PingError::new(ErrorKind::Shutdown, format!("could not spawn pacing loop: {e}")))?;
        self.pacing_thread = Some(handle);
        self.state = State::Running;
        Ok(())
    }

    /// Stops the pacing loop and closes the connection. Calling it again is a no-op.
    ///
    /// Returns after the current probe cycle at the latest, whether or not the event receiver is still
    /// being drained. Events not yet delivered are dropped.
    pub fn stop(&mut self) -> PingResult<()> {
        if self.state == State::Stopped {
            return Ok(());
        }
        self.state = State::Stopped;
        self.stop_condition.set_should_stop();

        // The loop notices the stop after its current receive at the latest.
        let join_result = match self.pacing_thread.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        };
        // Last reference now that the loop is gone; dropping it closes the socket.
        self.socket = None;
        tracing::debug!("session closed");

        join_result.map_err(|_| PingError::new(ErrorKind::Shutdown, "pacing loop panicked"))
    }
}

impl<S> Drop for Session<S>
where
    S: TSocket + 'static,
{
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{event_channel, Event, ProbeOutcome};
    use crate::icmp::socket::tests::SocketMock;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::{Duration, Instant};

    fn session(config: ProbeConfig) -> Session<SocketMock> {
        Session::with_socket(Endpoint::new(IpAddr::V4(Ipv4Addr::LOCALHOST)), config, SocketMock::new_default())
    }

    #[test]
    fn start_runs_pacing_loop() {
        let mut session = session(ProbeConfig::default().with_count(2).with_interval(Duration::from_millis(1)));
        let (tx, rx) = event_channel(8);

        session.start(tx).unwrap();

        assert_eq!(State::Running, session.state());
        assert!(matches!(rx.recv().unwrap(), Event::Probe(ProbeOutcome::Result(_))));
        assert!(matches!(rx.recv().unwrap(), Event::Probe(ProbeOutcome::Result(_))));
        assert!(matches!(rx.recv().unwrap(), Event::Probe(ProbeOutcome::Exhausted)));
        session.stop().unwrap();
    }

    #[test]
    fn stop_is_idempotent() {
        let mut session = session(ProbeConfig::default());
        let (tx, _rx) = event_channel(8);
        session.start(tx).unwrap();

        assert!(session.stop().is_ok());
        assert!(session.stop().is_ok());
        assert_eq!(State::Stopped, session.state());
        assert!(session.socket.is_none());
    }

    #[test]
    fn stop_without_start_closes_socket() {
        let mut session = session(ProbeConfig::default());
        session.stop().unwrap();
        assert!(session.socket.is_none());
    }

    #[test]
    fn stop_ends_pacing_loop_promptly() {
        let mut session = session(ProbeConfig::default().with_interval(Duration::from_secs(30)));
        let (tx, rx) = event_channel(8);
        session.start(tx).unwrap();
        rx.recv().unwrap();
        let start = Instant::now();

        session.stop().unwrap();

        assert!(start.elapsed() < Duration::from_secs(10));
        // The loop's sender is gone with the loop.
        assert!(rx.recv().is_err());
    }

    #[test]
    fn stop_does_not_wait_for_undrained_receiver() {
        let mut session = session(ProbeConfig::default().with_interval(Duration::from_millis(1)));
        let (tx, rx) = event_channel(1);
        session.start(tx).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let start = Instant::now();

        session.stop().unwrap();

        assert!(start.elapsed() < Duration::from_secs(10));
        drop(rx);
    }

    #[test]
    fn cannot_restart_stopped_session() {
        let mut session = session(ProbeConfig::default());
        session.stop().unwrap();
        let (tx, _rx) = event_channel(8);

        let error = session.start(tx).unwrap_err();

        assert_eq!(ErrorKind::Shutdown, error.kind());
    }

    #[test]
    fn cannot_start_twice() {
        let mut session = session(ProbeConfig::default().with_interval(Duration::from_millis(1)));
        let (tx, _rx) = event_channel(64);
        session.start(tx.clone()).unwrap();

        assert!(session.start(tx).is_err());
    }
}
