//! The scheduler. This module contains the [`SarMonitor`] struct and the
//! [`run_cycle`] it fires on every tick.

use crate::{AcquireError, EmitSummary, GaugeEmitter, Report, ReportAcquirer, emit_report};
use std::{error::Error, iter::successors, sync::Arc};
use tokio::{
    spawn,
    time::{Duration, Instant, MissedTickBehavior, interval_at},
};
use tracing::{Instrument, Span, info_span, trace, warn};

/// Fires a sampling cycle at a fixed interval, forever.
pub struct SarMonitor {
    acquirer: ReportAcquirer,
    emitter: Arc<GaugeEmitter>,
    interval: Duration,
    counter: u64,
}

impl SarMonitor {
    /// Create a monitor that runs a cycle every `interval`. `interval` must
    /// not be zero.
    pub fn new(acquirer: ReportAcquirer, emitter: Arc<GaugeEmitter>, interval: Duration) -> Self {
        Self {
            acquirer,
            emitter,
            interval,
            counter: 0,
        }
    }

    /// Spawn the scheduler loop.
    ///
    /// The first cycle starts one full interval from now. Each tick spawns a
    /// cycle in its own task and moves on; cycles are never joined or
    /// cancelled, so a slow one simply overlaps the next.
    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        spawn(async move {
            let mut ticks = interval_at(Instant::now() + self.interval, self.interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticks.tick().await;

                // One span per cycle, so every event from the acquirer and
                // emitter can be correlated by `cycle_id`.
                let cycle_id = self.counter;
                self.counter = self.counter.wrapping_add(1);
                let span = info_span!(parent: None, "Cycle", cycle_id);

                trace!(cycle_id, "Spawning cycle");
                spawn(
                    run_cycle(self.acquirer.clone(), self.emitter.clone()).instrument(span),
                );
            }
        })
    }
}

/// Run one acquire, translate, emit cycle.
///
/// Errors are logged here and returned only for inspection; nothing above a
/// cycle needs to act on them.
pub async fn run_cycle(
    acquirer: ReportAcquirer,
    emitter: Arc<GaugeEmitter>,
) -> Result<EmitSummary, AcquireError> {
    crate::metrics::record_cycle_start();
    let started = Instant::now();

    let result = acquirer.acquire_records().await.map(|records| {
        let report = Report::new(records, Span::current());
        report.span().in_scope(|| emit_report(&report, &emitter))
    });

    crate::metrics::record_cycle_end(started.elapsed(), result.is_err());

    if let Err(err) = &result {
        let chain: Vec<String> = successors(Some(err as &dyn Error), |&err| err.source())
            .map(ToString::to_string)
            .collect();
        warn!(error = %chain.join(": "), "Abandoning sampling cycle");
    }
    result
}
