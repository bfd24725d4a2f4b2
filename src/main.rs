use clap::Parser;
use eyre::WrapErr;
use sar_statsd::{Config, GaugeEmitter, init_metrics, init_tracing, run_cycles};
use std::sync::Arc;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let config = Config::parse();
    init_tracing(config.json_logs);

    let emitter = GaugeEmitter::connect(config.destination, &config.prefix)
        .wrap_err_with(|| format!("failed to create statsd socket for {}", config.destination))?;
    init_metrics(config.destination, &config.prefix)?;

    info!(
        destination = %config.destination,
        prefix = %config.prefix,
        interval = %humantime::format_duration(config.interval),
        "Forwarding sar metrics"
    );

    let jh = run_cycles(&config, Arc::new(emitter));
    tokio::pin!(jh);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    select! {
        _ = &mut ctrl_c => {
            info!("Received Ctrl-C, shutting down");
            Ok(())
        }
        res = &mut jh => {
            error!("Scheduler task exited");
            res.wrap_err("scheduler task failed")
        }
    }
}
