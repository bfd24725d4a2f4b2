//! Shipping a [`Report`] to statsd.

use crate::{GaugeEmitter, Report, record::translate};
use tracing::{info, instrument, trace};

/// What happened to the records of one report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitSummary {
    /// Records translated and sent as gauges.
    pub emitted: usize,

    /// Records without a usable value: headers, comments, and values that
    /// are NaN or infinite.
    pub skipped: usize,
}

/// Translate every record of `report` and send the results as gauges.
///
/// Records that do not translate, or whose value the emitter refuses to send,
/// are skipped silently; they only show up in the counts of the returned
/// summary and the closing event.
#[instrument(skip_all, name = "Emitting metrics")]
pub fn emit_report(report: &Report, emitter: &GaugeEmitter) -> EmitSummary {
    let mut summary = EmitSummary::default();

    for record in report.iter() {
        match translate(record) {
            Some(metric) if emitter.emit_gauge(&metric.name, metric.value) => {
                trace!(name = %metric.name, value = metric.value, "Emitted gauge");
                summary.emitted += 1;
            }
            _ => summary.skipped += 1,
        }
    }

    crate::metrics::record_emission(summary.emitted, summary.skipped);

    // Fields, not a formatted message, so collectors can pick them apart.
    info!(
        emitted = summary.emitted,
        skipped = summary.skipped,
        "finished emitting report"
    );

    summary
}
