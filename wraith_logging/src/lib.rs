//! Logging setup shared by every wraith crate.
//!
//! Library code logs through the `log` facade using `target: "wraith"`. The subscriber
//! installed here is a `tracing-subscriber` fmt subscriber, which also captures `log`
//! records, filtered by `RUST_LOG`.
//!
//! Secrets, passwords, digests and tokens must never appear in a log line.

pub use tracing::{self, debug, error, info, instrument, trace, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Sets up the logging for any crate. Panics are logged, then the process exits
pub fn setup_log() {
    std::panic::set_hook(Box::new(|info| {
        error!(target: "wraith", "Panic occurred: {}", info);
        std::process::exit(1);
    }));

    setup_log_no_panic_hook()
}

/// Installs the subscriber only. Safe to call more than once; later calls are no-ops
pub fn setup_log_no_panic_hook() {
    let _ = SubscriberBuilder::default()
        .with_line_number(true)
        .with_file(true)
        .with_span_events(FmtSpan::NONE)
        .with_env_filter(EnvFilter::from_default_env())
        .finish()
        .try_init();
}
