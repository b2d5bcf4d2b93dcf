//! Process-wide `tracing` subscriber for hosts embedding a dispatcher.
//!
//! Dispatch events are emitted under the `switchyard::dispatch` target. The
//! subscriber installed here writes them to stderr as flattened JSON or as
//! compact lines, filtered by the configured `EnvFilter` expression.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, time::UtcTime};

use switchyard_config::{KernelConfig, LogFormat};

/// Format chosen by the first successful initialisation.
static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Proof that a subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Output format of the installed subscriber. Later initialisations
    /// report the format of the first one.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Failure to set up telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter expression did not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Rejected expression.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another subscriber already owns the global slot.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global subscriber described by `config`.
///
/// Only the first successful call installs anything; later calls return a
/// handle for the subscriber already in place.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter and
/// [`TelemetryError::Subscriber`] when a foreign subscriber is already
/// installed.
///
/// # Examples
///
/// ```rust
/// use switchyard::telemetry;
/// use switchyard_config::KernelConfig;
///
/// # fn main() -> Result<(), switchyard::telemetry::TelemetryError> {
/// let handle = telemetry::initialise(&KernelConfig::default())?;
/// assert_eq!(telemetry::initialise(&KernelConfig::default())?, handle);
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &KernelConfig) -> Result<TelemetryHandle, TelemetryError> {
    let format = INSTALLED.get_or_try_init(|| {
        tracing::subscriber::set_global_default(subscriber(config)?)?;
        Ok::<_, TelemetryError>(config.log_format())
    })?;
    Ok(TelemetryHandle { format: *format })
}

fn filter(config: &KernelConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
        filter: config.log_filter().to_owned(),
        message: error.to_string(),
    })
}

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

fn subscriber(config: &KernelConfig) -> Result<BoxedSubscriber, TelemetryError> {
    let stderr = fmt::Subscriber::builder()
        .with_env_filter(filter(config)?)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(stderr.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(stderr.compact().finish()),
    })
}
