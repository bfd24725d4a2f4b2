//! Command-line configuration.

use clap::Parser;
use std::{
    ffi::OsString,
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

/// Everything the bridge needs to know, parsed from the command line once at
/// startup.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Forward sar activity counters to statsd as gauges")]
pub struct Config {
    /// Destination statsd server address. `:PORT` means localhost.
    #[arg(
        short = 'd',
        long,
        default_value = "127.0.0.1:8125",
        value_parser = parse_destination
    )]
    pub destination: SocketAddr,

    /// Statsd prefix for metrics
    #[arg(short = 'p', long, default_value = "sar")]
    pub prefix: String,

    /// Interval to send metrics, e.g. `10s` or `1m 30s`
    #[arg(short = 'i', long, default_value = "10s", value_parser = parse_interval)]
    pub interval: Duration,

    /// The `sar` executable used to capture samples
    #[arg(long, default_value = "sar")]
    pub sar_bin: OsString,

    /// The `sadf` executable used to format samples
    #[arg(long, default_value = "sadf")]
    pub sadf_bin: OsString,

    /// Log JSON lines instead of human-readable text
    #[arg(long)]
    pub json_logs: bool,
}

/// Resolve `host:port`, accepting `:port` as shorthand for the loopback
/// address. Resolution happens once; the bridge never re-resolves.
fn parse_destination(s: &str) -> Result<SocketAddr, String> {
    let target = match s.strip_prefix(':') {
        Some(port) => format!("127.0.0.1:{port}"),
        None => s.to_owned(),
    };
    target
        .to_socket_addrs()
        .map_err(|err| format!("cannot resolve {s}: {err}"))?
        .next()
        .ok_or_else(|| format!("{s} resolved to no addresses"))
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(s).map_err(|err| err.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_owned());
    }
    Ok(interval)
}
