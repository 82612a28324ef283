use crate::ProbeResult;
use std::fmt;

const NO_DATA: &str = "No pings sent. Check your input.";

/// Results of a session in the order they were emitted.
#[derive(Clone, Debug, Default)]
pub struct SessionStats {
    results: Vec<ProbeResult>,
    errors: usize,
}

/// Aggregates over a non-empty [`SessionStats`].
///
/// RTT figures cover every recorded result, including unanswered ones: a non echo reply message
/// still carries the send timestamp of the probe that triggered it.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub host: String,
    pub sent: usize,
    pub received: usize,
    pub lost: usize,
    pub loss_percent: f64,
    pub min_millis: f64,
    pub max_millis: f64,
    pub average_millis: f64,
}

impl SessionStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ProbeResult) {
        self.results.push(result);
    }

    /// Counts a probe cycle that failed without producing a result.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    #[must_use]
    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    #[must_use]
    pub fn errors(&self) -> usize {
        self.errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// `None` when nothing was recorded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn summary(&self) -> Option<Summary> {
        let first = self.results.first()?;
        let sent = self.results.len();
        let lost = self.results.iter().filter(|result| !result.answered).count();

        let rtts = self.results.iter().map(|result| result.round_trip_millis);
        let min_millis = rtts.clone().fold(f64::INFINITY, f64::min);
        let max_millis = rtts.clone().fold(f64::NEG_INFINITY, f64::max);
        let average_millis = rtts.sum::<f64>() / sent as f64;

        Some(Summary {
            host: first.peer_host.clone(),
            sent,
            received: sent - lost,
            lost,
            loss_percent: 100.0 * lost as f64 / sent as f64,
            min_millis,
            max_millis,
            average_millis,
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ping statistics for {}:", self.host)?;
        writeln!(
            f,
            "\tSent = {}, Received = {}, Lost = {} ({:.1}% loss)",
            self.sent, self.received, self.lost, self.loss_percent
        )?;
        writeln!(f, "Approximate RTT in milliseconds:")?;
        write!(
            f,
            "\tMinimum = {:.2}, Maximum = {:.2}, Average = {:.2}",
            self.min_millis, self.max_millis, self.average_millis
        )
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.summary() {
            Some(summary) => write!(f, "{summary}"),
            None => f.write_str(NO_DATA),
        }
    }
}
