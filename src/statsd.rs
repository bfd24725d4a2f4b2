//! Forwarding gauges to statsd, one datagram per value, nothing buffered.

use cadence::{Gauged, StatsdClient, UdpMetricSink};
use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
};
use tracing::{debug, trace};

/// Sends the translated gauges of every cycle.
///
/// Sending takes `&self` and never blocks, so one emitter can be shared
/// between any number of concurrent cycles behind an [`Arc`].
///
/// [`Arc`]: std::sync::Arc
#[derive(Debug)]
pub struct GaugeEmitter {
    client: StatsdClient,
}

impl GaugeEmitter {
    /// Bind an ephemeral local port and send to `destination`. Every key
    /// sent is prefixed with `prefix` and a dot, unless `prefix` is empty.
    pub fn connect(destination: SocketAddr, prefix: &str) -> io::Result<Self> {
        let local: SocketAddr = match destination {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        let local = socket.local_addr()?;

        let sink = UdpMetricSink::from(destination, socket).map_err(io::Error::other)?;
        let client = StatsdClient::from_sink(prefix, sink);

        debug!(%destination, %local, "Connected statsd client");
        Ok(Self { client })
    }

    /// Set the gauge `name` to `value`. Returns whether anything was sent.
    ///
    /// Negative values are preceded by a reset to zero, since a leading sign
    /// means "adjust" in the statsd gauge syntax. NaN and infinities are
    /// dropped.
    pub fn emit_gauge(&self, name: &str, value: f64) -> bool {
        if !value.is_finite() {
            trace!(name, value, "Dropping non-finite gauge");
            return false;
        }
        // Turns -0.0 into 0.0, which would otherwise go out as `-0`.
        let value = value + 0.0;
        if value < 0.0 {
            self.send(name, 0.0);
        }
        self.send(name, value);
        true
    }

    fn send(&self, name: &str, value: f64) {
        if let Err(err) = self.client.gauge(name, value) {
            debug!(%err, name, value, "Failed to send gauge");
        }
    }
}
