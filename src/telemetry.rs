//! Tracing setup for binaries and demos embedding the pipeline.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! embedding application's call. `init` wires the conventional setup:
//! an `EnvFilter` honoring `RUST_LOG` with a quiet default, a compact fmt
//! layer, and miette's panic hook for readable panics.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the default tracing subscriber and miette panic hook.
///
/// Safe to call once per process; a second call keeps the first subscriber
/// and is otherwise a no-op.
pub fn init() {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tailorgraph=info"));

    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);
    if registry.try_init().is_ok() {
        miette::set_panic_hook();
    }
}
