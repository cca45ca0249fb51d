//! Logging facilities for Horizon DataList.
//!
//! Horizon DataList uses the `tracing` crate for instrumentation. To see
//! logs, install a subscriber in the embedding application:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! Every subsystem logs under its own target (see [`targets`]) so hosts can
//! filter, e.g. `RUST_LOG=horizon_datalist::bridge=debug`.

/// Target names for log filtering.
pub mod targets {
    /// Signal emission target.
    pub const SIGNAL: &str = "horizon_datalist_core::signal";
    /// Widget crate target.
    pub const DATALIST: &str = "horizon_datalist";
    /// Query string translation.
    pub const QUERY: &str = "horizon_datalist::query";
    /// Filter dispatch resolution.
    pub const DISPATCH: &str = "horizon_datalist::dispatch";
    /// Host hook wiring.
    pub const HOOKS: &str = "horizon_datalist::hooks";
    /// Pagination and data-push channels.
    pub const BRIDGE: &str = "horizon_datalist::bridge";
    /// Startup ordering.
    pub const SEQUENCER: &str = "horizon_datalist::sequencer";
    /// Persisted preferences.
    pub const PREFERENCES: &str = "horizon_datalist::preferences";
    /// Store updates.
    pub const STORE: &str = "horizon_datalist::store";
}

/// Span names used for timing.
pub mod span_names {
    /// The single initialization pass.
    pub const INIT: &str = "init";
    /// Query string to filter batch pipeline.
    pub const QUERY_PIPELINE: &str = "query_pipeline";
    /// Handling one pagination-change signal.
    pub const PAGINATION: &str = "pagination_change";
}

/// A guard that keeps a timing span entered until dropped.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_datalist::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }

    /// Create a span tagged with the widget instance it belongs to.
    pub fn for_instance(name: &'static str, instance: &str) -> Self {
        let span = tracing::info_span!(
            target: "horizon_datalist::perf",
            "perf",
            operation = name,
            instance = instance
        );
        Self {
            span: span.entered(),
        }
    }
}

/// Trace-level event under the widget crate target.
#[macro_export]
macro_rules! datalist_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: $crate::logging::targets::DATALIST, $($arg)*)
    };
}

/// Debug-level event under the widget crate target.
#[macro_export]
macro_rules! datalist_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: $crate::logging::targets::DATALIST, $($arg)*)
    };
}

/// Warn-level event under the widget crate target.
#[macro_export]
macro_rules! datalist_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: $crate::logging::targets::DATALIST, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("test_operation");
        let _nested = PerfSpan::for_instance("nested", "dl__items__test");
    }

    #[test]
    fn test_targets_share_crate_prefix() {
        for target in [
            targets::QUERY,
            targets::DISPATCH,
            targets::HOOKS,
            targets::BRIDGE,
            targets::SEQUENCER,
            targets::PREFERENCES,
            targets::STORE,
        ] {
            assert!(target.starts_with(targets::DATALIST));
        }
        assert!(targets::SIGNAL.starts_with("horizon_datalist_core::"));
    }
}
