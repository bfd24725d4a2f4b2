//! Tracing subscriber setup. See [`init_tracing`].

use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Install a global subscriber that writes events to stderr.
///
/// Filtering follows `RUST_LOG` and defaults to `info`. `RUST_LOG=debug`
/// shows each tool invocation, `trace` shows every gauge sent.
///
/// With `json` set, each event is one JSON object, including the fields of
/// the enclosing `Cycle` span, which is what log shippers want. Otherwise the
/// output is the usual human-readable format.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
