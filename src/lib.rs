//! Forward `sar` activity counters to statsd as gauges.
//!
//! Every interval the bridge captures one sample window with `sar`, reads it
//! back as tab-delimited records with `sadf`, translates each record into a
//! dotted metric name and value, and sends the result to a statsd server over
//! UDP.
//!
//! The pieces, leaves first:
//! - [`ReportAcquirer`] runs the two tools against a [`SampleWindow`] that is
//!   removed again however the cycle ends.
//! - [`translate`] turns a [`Record`] into a [`Metric`], converting kilobyte
//!   units and qualifying per-device rows.
//! - [`GaugeEmitter`] sends gauges, fire-and-forget. [`emit_report`] drives
//!   it for a whole [`Report`].
//! - [`SarMonitor`] fires [`run_cycle`] on a fixed interval, each cycle in its
//!   own task and its own tracing span.
//!
//! [`run_cycles`] wires these together. The binary adds [`init_tracing`] and
//! [`init_metrics`], which reports the bridge's own health to the same statsd
//! server.

mod config;
pub use config::Config;

mod emit;
pub use emit::{EmitSummary, emit_report};

pub(crate) mod metrics;
pub use self::metrics::init_metrics;

mod monitor;
pub use monitor::{SarMonitor, run_cycle};

mod record;
pub use record::{Metric, Record, translate};

mod report;
pub use report::{AcquireError, Report, ReportAcquirer, SampleWindow, read_records};

mod statsd;
pub use statsd::GaugeEmitter;

mod trace;
pub use trace::init_tracing;

use std::sync::Arc;
use tokio::task::JoinHandle;

/// Start running cycles as described by `config`, sending to `emitter`.
///
/// The returned handle only resolves if the scheduler task panics; cycles
/// themselves never stop it.
pub fn run_cycles(config: &Config, emitter: Arc<GaugeEmitter>) -> JoinHandle<()> {
    let acquirer = ReportAcquirer::new(&config.sar_bin, &config.sadf_bin);
    SarMonitor::new(acquirer, emitter, config.interval).spawn()
}
