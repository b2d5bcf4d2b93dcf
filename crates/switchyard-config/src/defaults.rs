use crate::logging::LogFormat;

/// Default log filter expression used by the kernel.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default ceiling on nested forwards within a single run.
pub const DEFAULT_MAX_FORWARD_DEPTH: u32 = 16;

/// Default log filter expression used by the kernel.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the kernel.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default forward depth ceiling.
pub fn default_max_forward_depth() -> u32 {
    DEFAULT_MAX_FORWARD_DEPTH
}
