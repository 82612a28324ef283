use argh::FromArgs;
use ping_probe::{event_channel, Coordinator, Event, FamilyPreference, PingError, ProbeConfig, Session, SocketType};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const EVENT_CHANNEL_SIZE: usize = 8;

#[derive(FromArgs)]
/// pb - send ICMP ECHO_REQUEST to a host and report round-trip statistics
struct Args {
    #[argh(option, short = 't', default = "0")]
    /// set the IP time to live (hop limit for IPv6); 0 keeps the system default
    ttl: u8,

    #[argh(option, short = 'c', default = "0")]
    /// stop after <count> probes; 0 probes until interrupted
    count: u32,

    #[argh(switch)]
    /// only use IPv4 addresses
    ipv4: bool,

    #[argh(switch)]
    /// only use IPv6 addresses
    ipv6: bool,

    #[argh(switch)]
    /// use a raw socket instead of an unprivileged datagram socket
    raw: bool,

    #[argh(switch, short = 'v')]
    /// log protocol details to stderr
    verbose: bool,

    #[argh(positional)]
    /// host name or IP address
    host: String,
}

impl Args {
    fn probe_config(&self) -> Result<ProbeConfig, String> {
        let family = match (self.ipv4, self.ipv6) {
            (true, true) => return Err("--ipv4 and --ipv6 exclude each other".to_owned()),
            (true, false) => FamilyPreference::V4Only,
            (false, true) => FamilyPreference::V6Only,
            (false, false) => FamilyPreference::PreferV4,
        };
        let socket_type = if self.raw { SocketType::Raw } else { SocketType::Dgram };
        Ok(ProbeConfig::default()
            .with_ttl(self.ttl)
            .with_count(self.count)
            .with_family(family)
            .with_socket_type(socket_type))
    }
}

fn run(host: &str, config: ProbeConfig) -> Result<(), PingError> {
    let mut session = Session::open(host, config)?;

    let (event_tx, event_rx) = event_channel(EVENT_CHANNEL_SIZE);
    let interrupt_tx = event_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        // Fails only once the coordinator is done.
        let _ = interrupt_tx.send(Event::Interrupt);
    }) {
        tracing::warn!("could not install interrupt handler: {e}");
    }

    session.start(event_tx)?;
    let mut stdout = std::io::stdout().lock();
    Coordinator::new(session, event_rx).run(&mut stdout)?;
    Ok(())
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let max_level = if args.verbose { Level::TRACE } else { Level::WARN };
    let subscriber = FmtSubscriber::builder().with_max_level(max_level).with_writer(std::io::stderr).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }

    let config = match args.probe_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match run(&args.host, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(arguments: &[&str]) -> Args {
        Args::from_args(&["pb"], arguments).unwrap()
    }

    #[test]
    fn defaults_map_to_unbounded_probe() {
        let config = args(&["example.com"]).probe_config().unwrap();
        assert_eq!(ProbeConfig::default(), config);
    }

    #[test]
    fn flags_map_to_config() {
        let args = args(&["-t", "64", "-c", "3", "--ipv6", "--raw", "::1"]);
        let config = args.probe_config().unwrap();

        assert_eq!("::1", args.host);
        assert_eq!(Some(ping_probe::Ttl(64)), config.ttl);
        assert_eq!(Some(3), config.count);
        assert_eq!(FamilyPreference::V6Only, config.family);
        assert_eq!(SocketType::Raw, config.socket_type);
    }

    #[test]
    fn conflicting_families_are_rejected() {
        assert!(args(&["--ipv4", "--ipv6", "localhost"]).probe_config().is_err());
    }

    #[test]
    fn host_is_required() {
        assert!(Args::from_args(&["pb"], &[]).is_err());
    }
}
