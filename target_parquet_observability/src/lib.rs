//! Logging setup.
//!
//! Logs always go to stderr: stdout carries the protocol output of the
//! target. `RUST_LOG` takes precedence over the configured level and
//! `RUST_LOG_FORMAT=json` switches to JSON lines.
use std::io::IsTerminal;

use snafu::{ResultExt, Snafu};
use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, Layer, prelude::*, registry::LookupSpan};

use crate::format::TargetFormat;

mod format;

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

#[derive(Debug, Snafu)]
pub enum ObservabilityError {
    #[snafu(display("Failed to install the tracing subscriber"))]
    Install {
        source: tracing_subscriber::util::TryInitError,
    },
}

/// Installs the global subscriber, logging at `default_level` unless
/// `RUST_LOG` says otherwise.
pub fn init_observability(default_level: LevelFilter) -> Result<(), ObservabilityError> {
    tracing_subscriber::registry()
        .with(stderr(default_level))
        .try_init()
        .context(InstallSnafu {})
}

fn stderr<S>(default_level: LevelFilter) -> BoxedLayer<S>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let log_env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let json_fmt = std::env::var("RUST_LOG_FORMAT")
        .map(|val| val == "json")
        .unwrap_or(false);

    if json_fmt {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true)
            .json()
            .with_filter(log_env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .event_format(TargetFormat::default())
            .fmt_fields(TargetFormat::default())
            .with_filter(log_env_filter)
            .boxed()
    }
}
