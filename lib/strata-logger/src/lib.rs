use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initializes the global `tracing` subscriber.
///
/// Adapted from the teacher's `lib/logger`: a `Registry` with an
/// `EnvFilter` (seeded from `level`, further narrowed by `RUST_LOG` if
/// set) and a single `fmt` layer. The teacher's OpenTelemetry exporter
/// layer is dropped: nothing here emits spans to an OTLP collector.
pub fn init(level: LevelFilter) -> anyhow::Result<()> {
  let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

  Registry::default()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_target(true))
    .try_init()
    .map_err(|e| anyhow::anyhow!("failed to init logger: {e}"))
}
