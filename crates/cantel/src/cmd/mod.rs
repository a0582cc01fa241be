use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use cantel_codec::SignalDescriptor;
use cantel_pipeline::{DEFAULT_EVENT_LOG_CAPACITY, DEFAULT_HISTORY_CAPACITY};
use cantel_transport::{DEFAULT_MULTICAST_GROUP, DEFAULT_PORT};
use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod listen;
pub mod send;
pub mod signals;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive telemetry and print a live dashboard.
    Listen(ListenArgs),
    /// Encode a value and send it as one frame.
    Send(SendArgs),
    /// Decode a single frame given its id and payload bytes.
    Decode(DecodeArgs),
    /// Print the signal table.
    Signals(SignalsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Signals(args) => signals::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Local address to bind.
    #[arg(long, env = "CANTEL_BIND", default_value_t = default_bind())]
    pub bind: SocketAddr,
    /// IPv4 multicast group to join.
    #[arg(long, env = "CANTEL_GROUP", default_value_t = DEFAULT_MULTICAST_GROUP)]
    pub group: Ipv4Addr,
    /// Do not join a multicast group; accept unicast datagrams only.
    #[arg(long)]
    pub no_multicast: bool,
    /// Local interface used for the group membership.
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    pub interface: Ipv4Addr,
    /// Exit after N decoded frames.
    #[arg(long)]
    pub count: Option<u64>,
    /// Exit after this long (e.g. 30s, 500ms, 2m).
    #[arg(long)]
    pub duration: Option<String>,
    /// Dashboard refresh interval.
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Frames kept per signal.
    #[arg(long, default_value_t = DEFAULT_HISTORY_CAPACITY)]
    pub history: usize,
    /// Frames kept in the cross-signal event log.
    #[arg(long, default_value_t = DEFAULT_EVENT_LOG_CAPACITY)]
    pub event_log: usize,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Signal key, name, or numeric id (e.g. rpm, "Motor RPM", 0x100).
    pub signal: String,
    /// Engineering value. For faults: a mask (0x05) or flag names (overheat,undervoltage).
    #[arg(allow_hyphen_values = true)]
    pub value: String,
    /// Destination address.
    #[arg(long, env = "CANTEL_DEST", default_value_t = default_destination())]
    pub to: SocketAddr,
    /// Number of times to send the frame.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
    /// Delay between repeated frames (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub every: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame identifier (e.g. 0x100, 256, rpm).
    pub id: String,
    /// Payload bytes as hex (e.g. 05DC, "05 DC", 05:dc).
    #[arg(default_value = "")]
    pub payload: String,
}

#[derive(Args, Debug, Default)]
pub struct SignalsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}

fn default_destination() -> SocketAddr {
    SocketAddr::from((DEFAULT_MULTICAST_GROUP, DEFAULT_PORT))
}

/// Parse `"5s"`, `"500ms"`, `"2m"` or a bare number of seconds.
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = input.strip_suffix('m') {
        (num, "m")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Parse a frame id as `0x`-prefixed hex or decimal.
pub(crate) fn parse_id(input: &str) -> Option<u16> {
    let input = input.trim();
    match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => input.parse().ok(),
    }
}

/// Resolve a signal by key, display name, or numeric id.
pub(crate) fn resolve_signal(input: &str) -> CliResult<&'static SignalDescriptor> {
    cantel_codec::find(input)
        .or_else(|| parse_id(input).and_then(cantel_codec::lookup))
        .ok_or_else(|| CliError::usage(format!("unknown signal: {input}")))
}

/// Parse hex bytes, ignoring spaces, colons and an optional `0x` prefix.
pub(crate) fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = trimmed
        .bytes()
        .filter(|b| !matches!(b, b' ' | b':' | b'-' | b'_'))
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::usage(format!(
            "hex payload must have an even number of digits: {input}"
        )));
    }

    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| CliError::usage(format!("invalid hex payload: {input}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn ids_parse_as_hex_or_decimal() {
        assert_eq!(parse_id("0x1FF"), Some(0x1FF));
        assert_eq!(parse_id("0X104"), Some(0x104));
        assert_eq!(parse_id("256"), Some(0x100));
        assert_eq!(parse_id("0x10000"), None);
        assert_eq!(parse_id("rpm"), None);
    }

    #[test]
    fn signals_resolve_by_key_name_or_id() {
        assert_eq!(resolve_signal("rpm").unwrap().id, 0x100);
        assert_eq!(resolve_signal("Motor RPM").unwrap().id, 0x100);
        assert_eq!(resolve_signal("0x103").unwrap().key, "voltage");
        assert_eq!(resolve_signal("0x200").unwrap_err().code, crate::exit::USAGE);
    }

    #[test]
    fn hex_accepts_common_separators() {
        assert_eq!(parse_hex("05DC").unwrap(), vec![0x05, 0xDC]);
        assert_eq!(parse_hex("05 dc").unwrap(), vec![0x05, 0xDC]);
        assert_eq!(parse_hex("0x05:DC").unwrap(), vec![0x05, 0xDC]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
        assert!(parse_hex("5DC").is_err());
        assert!(parse_hex("zz").is_err());
    }
}
