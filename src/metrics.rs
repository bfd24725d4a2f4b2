//! The bridge's own health metrics. Check the docs for [`init_metrics`].

use metrics::{counter, gauge, histogram};
use metrics_exporter_dogstatsd::DogStatsDBuilder;
use std::{net::SocketAddr, sync::LazyLock, time::Duration};

const CYCLES_STARTED: &str = "bridge.cycles_started";
const CYCLES_STARTED_DESC: &str = "The total number of sampling cycles started";

const CYCLES_FAILED: &str = "bridge.cycles_failed";
const CYCLES_FAILED_DESC: &str = "The number of sampling cycles abandoned because of an error";

const CYCLES_IN_FLIGHT: &str = "bridge.cycles_in_flight";
const CYCLES_IN_FLIGHT_DESC: &str = "The number of sampling cycles currently running";

const METRICS_EMITTED: &str = "bridge.metrics_emitted";
const METRICS_EMITTED_DESC: &str = "The number of translated gauges sent to statsd";

const RECORDS_SKIPPED: &str = "bridge.records_skipped";
const RECORDS_SKIPPED_DESC: &str = "The number of report records without a numeric value";

const CYCLE_DURATION_HISTOGRAM: &str = "bridge.cycle_duration_ms";
const CYCLE_DURATION_HISTOGRAM_DESC: &str = "Wall time of a sampling cycle in milliseconds";

static DESCRIBE: LazyLock<()> = LazyLock::new(|| {
    metrics::describe_counter!(CYCLES_STARTED, CYCLES_STARTED_DESC);
    metrics::describe_counter!(CYCLES_FAILED, CYCLES_FAILED_DESC);
    metrics::describe_gauge!(CYCLES_IN_FLIGHT, CYCLES_IN_FLIGHT_DESC);
    metrics::describe_counter!(METRICS_EMITTED, METRICS_EMITTED_DESC);
    metrics::describe_counter!(RECORDS_SKIPPED, RECORDS_SKIPPED_DESC);
    metrics::describe_histogram!(
        CYCLE_DURATION_HISTOGRAM,
        metrics::Unit::Milliseconds,
        CYCLE_DURATION_HISTOGRAM_DESC
    );
});

pub(crate) fn record_cycle_start() {
    counter!(CYCLES_STARTED).increment(1);
    gauge!(CYCLES_IN_FLIGHT).increment(1);
}

pub(crate) fn record_cycle_end(elapsed: Duration, failed: bool) {
    gauge!(CYCLES_IN_FLIGHT).decrement(1);
    histogram!(CYCLE_DURATION_HISTOGRAM).record(elapsed.as_secs_f64() * 1000.0);
    if failed {
        counter!(CYCLES_FAILED).increment(1);
    }
}

pub(crate) fn record_emission(emitted: usize, skipped: usize) {
    counter!(METRICS_EMITTED).increment(emitted as u64);
    counter!(RECORDS_SKIPPED).increment(skipped as u64);
}

/// Build the exporter for the bridge's own metrics: DogStatsD lines to
/// `destination`, under the same prefix as the forwarded gauges.
fn exporter(destination: SocketAddr, prefix: &str) -> eyre::Result<DogStatsDBuilder> {
    let builder = DogStatsDBuilder::default()
        .with_remote_address(format!("udp://{destination}"))
        .map_err(|err| eyre::eyre!("invalid statsd address {destination}: {err:?}"))?
        .with_telemetry(false);
    Ok(if prefix.is_empty() {
        builder
    } else {
        builder.set_global_prefix(prefix)
    })
}

/// Install a DogStatsD exporter as the global metrics recorder, sending to
/// the same destination (and under the same prefix) as the forwarded gauges.
///
/// The bridge reports on itself under the `bridge.` namespace:
/// - `bridge.cycles_started` (counter): cycles launched by the scheduler.
/// - `bridge.cycles_failed` (counter): cycles abandoned on an error.
/// - `bridge.cycles_in_flight` (gauge): cycles currently running. This should
///   hover around zero or one; a steady climb means `sar` or `sadf` is
///   hanging.
/// - `bridge.metrics_emitted` (counter): gauges forwarded.
/// - `bridge.records_skipped` (counter): report rows with no usable value.
/// - `bridge.cycle_duration_ms` (histogram): cycle wall time.
///
/// Unlike the forwarded gauges, these are aggregated by the exporter and
/// flushed in the background.
///
/// Fails if a global recorder is already installed.
pub fn init_metrics(destination: SocketAddr, prefix: &str) -> eyre::Result<()> {
    exporter(destination, prefix)?
        .install()
        .map_err(|err| eyre::eyre!("failed to install metrics exporter: {err:?}"))?;
    LazyLock::force(&DESCRIBE);
    Ok(())
}
