use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use csidaq_engine::CancelFlag;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod acquire;
pub mod discover;
pub mod provision;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen for a node's broadcast announcement and print its address.
    Discover(DiscoverArgs),
    /// Send Wi-Fi credentials to a node in provisioning mode.
    Provision(ProvisionArgs),
    /// Capture CSI frames from a node and persist them.
    Acquire(AcquireArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Discover(args) => discover::run(args, format),
        Command::Provision(args) => provision::run(args, format),
        Command::Acquire(args) => acquire::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum AuthProtocol {
    /// WPA2-PSK (personal).
    Wpa2psk,
    /// WPA2-Enterprise (PEAP).
    Peap,
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// How long to listen for announcements (e.g. 75s, 500ms).
    #[arg(long, default_value = "75s")]
    pub window: String,
    /// Port to listen on.
    #[arg(long, default_value_t = csidaq_wire::DISCOVERY_PORT)]
    pub port: u16,
}

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Network name (SSID).
    #[arg(long)]
    pub ssid: String,
    /// Network passphrase.
    #[arg(long)]
    pub passphrase: String,
    /// Authentication protocol.
    #[arg(long, value_enum, default_value_t = AuthProtocol::Wpa2psk)]
    pub auth: AuthProtocol,
    /// EAP identity. Required with --auth peap.
    #[arg(long)]
    pub identity: Option<String>,
    /// Callback address the node should stream CSI records to.
    /// Defaults to this host's outbound address.
    #[arg(long)]
    pub server_ip: Option<Ipv4Addr>,
    /// Callback port the node should stream CSI records to.
    #[arg(long, default_value_t = csidaq_wire::DEFAULT_DATA_PORT)]
    pub server_port: u16,
}

#[derive(Args, Debug)]
pub struct AcquireArgs {
    /// Node address (from `discover`).
    #[arg(long)]
    pub target: Ipv4Addr,
    /// SQLite database file to persist into. Created if absent.
    #[arg(long)]
    pub db: PathBuf,
    /// Scenario label attached to every persisted frame.
    #[arg(long)]
    pub scenario: String,
    /// Requested capture duration in seconds, forwarded to the node.
    #[arg(long, default_value_t = 60)]
    pub duration: u32,
    /// Local port to receive CSI records on.
    #[arg(long, default_value_t = csidaq_wire::DEFAULT_DATA_PORT)]
    pub port: u16,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Route Ctrl-C into the shared cancellation flag.
pub fn install_ctrlc_handler(cancel: CancelFlag) -> CliResult<()> {
    ctrlc::set_handler(move || {
        cancel.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Parse a human duration like `75s`, `500ms`, or a bare second count.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds_and_millis() {
        assert_eq!(parse_duration("75s").expect("seconds"), Duration::from_secs(75));
        assert_eq!(
            parse_duration("500ms").expect("millis"),
            Duration::from_millis(500)
        );
        assert_eq!(parse_duration("10").expect("bare"), Duration::from_secs(10));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("").is_err());
    }
}
