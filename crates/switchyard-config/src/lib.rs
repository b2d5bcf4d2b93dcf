//! Runtime configuration shared by switchyard kernels.
//!
//! Values resolve through `ortho_config` with the usual precedence: command
//! line flags override `SWITCHYARD_*` environment variables, which override a
//! configuration file, which overrides the built-in defaults exported from
//! this crate.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_FORWARD_DEPTH, default_log_filter, default_log_filter_string,
    default_log_format, default_max_forward_depth,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved kernel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SWITCHYARD")]
pub struct KernelConfig {
    /// `tracing` filter expression applied by the telemetry subscriber.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Disables the exception-category recovery table. HTTP events are still
    /// recovered through their own table.
    #[ortho_config(default = false, cli_default_as_absent)]
    pub disable_error_recovery: bool,
    /// Maximum number of nested forwards allowed within a single run.
    #[ortho_config(default = DEFAULT_MAX_FORWARD_DEPTH)]
    pub max_forward_depth: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            disable_error_recovery: false,
            max_forward_depth: default_max_forward_depth(),
        }
    }
}

impl KernelConfig {
    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Whether application errors are offered to the recovery table.
    #[must_use]
    pub const fn catch_errors(&self) -> bool {
        !self.disable_error_recovery
    }

    /// Ceiling on nested forwards.
    #[must_use]
    pub const fn max_forward_depth(&self) -> u32 {
        self.max_forward_depth
    }

    /// Rejects values the kernel cannot operate with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyLogFilter`] when the filter is blank and
    /// [`ConfigError::ZeroForwardDepth`] when forwarding would be impossible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }
        if self.max_forward_depth == 0 {
            return Err(ConfigError::ZeroForwardDepth);
        }
        Ok(())
    }
}

/// Semantic validation failures for an otherwise well-formed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The log filter expression was empty.
    #[error("log filter must not be empty")]
    EmptyLogFilter,
    /// Forward depth of zero leaves no room for recovery.
    #[error("max forward depth must be at least 1")]
    ZeroForwardDepth,
}
