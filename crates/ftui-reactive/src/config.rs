#![forbid(unsafe_code)]

//! Per-observable configuration.
//!
//! Every observable carries a small, `Copy` [`ObservableConfig`]. The defaults
//! suit UI state with a handful of listeners; the knobs exist for hot
//! observables with many subscribers and for tests that want to inspect every
//! fault a dispatch produced.

/// Configuration for listener storage and fault retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservableConfig {
    /// Capacity reserved when storage is promoted from one listener to many.
    /// Default: 2
    pub initial_listener_capacity: usize,

    /// Maximum number of listener faults retained per observable before the
    /// oldest are dropped. `0` disables retention entirely.
    /// Default: 64
    pub fault_capacity: usize,

    /// Whether listener faults are logged through `tracing` at the dispatch site.
    /// Default: true
    pub log_faults: bool,
}

impl Default for ObservableConfig {
    fn default() -> Self {
        Self {
            initial_listener_capacity: 2,
            fault_capacity: 64,
            log_faults: true,
        }
    }
}

impl ObservableConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capacity reserved on promotion to multi-listener storage.
    ///
    /// Values below 2 are raised to 2, the size of the smallest multi-listener set.
    #[must_use]
    pub fn with_initial_listener_capacity(mut self, capacity: usize) -> Self {
        self.initial_listener_capacity = capacity.max(2);
        self
    }

    /// Set how many faults an observable retains.
    #[must_use]
    pub fn with_fault_capacity(mut self, capacity: usize) -> Self {
        self.fault_capacity = capacity;
        self
    }

    /// Enable or disable fault logging.
    #[must_use]
    pub fn with_fault_logging(mut self, enabled: bool) -> Self {
        self.log_faults = enabled;
        self
    }

    /// Configuration that retains nothing and logs nothing.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            fault_capacity: 0,
            log_faults: false,
            ..Self::default()
        }
    }
}
