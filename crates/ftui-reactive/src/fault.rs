#![forbid(unsafe_code)]

//! Listener fault isolation.
//!
//! Listener callbacks return [`ListenerResult`]. A dispatch never stops at a
//! failing listener: the error is wrapped in a [`ListenerFault`], logged, and
//! collected into the [`Dispatch`] report while the remaining listeners still
//! run. Observables append the faults of their own dispatches to a bounded
//! [`FaultLog`], which callers drain through
//! [`Observable::take_faults`](crate::Observable::take_faults).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Listener returns `Err` | Callback rejected the change | Fault recorded, dispatch continues |
//! | Nested propagation fails | Downstream listener of a binding faulted | Faults surface on the mutated observable |
//! | Log full | More faults than `fault_capacity` | Oldest fault dropped, warning logged |

use std::collections::VecDeque;
use std::fmt;

/// Result type returned by every listener callback.
pub type ListenerResult = Result<(), ListenerError>;

/// Error returned by a listener callback.
///
/// Carries a message and, when the listener itself propagated a change that
/// faulted further downstream, the faults of that nested dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerError {
    message: String,
    nested: Vec<ListenerFault>,
}

impl ListenerError {
    /// Create an error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            nested: Vec::new(),
        }
    }

    /// Create an error wrapping the faults of a nested dispatch.
    #[must_use]
    pub fn nested(message: impl Into<String>, faults: Vec<ListenerFault>) -> Self {
        Self {
            message: message.into(),
            nested: faults,
        }
    }

    /// Convert the faults of a nested dispatch into a listener result.
    ///
    /// Returns `Ok(())` when `faults` is empty.
    pub fn check_nested(message: &str, faults: Vec<ListenerFault>) -> ListenerResult {
        if faults.is_empty() {
            Ok(())
        } else {
            Err(Self::nested(message, faults))
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Faults of the nested dispatch that caused this error, if any.
    #[must_use]
    pub fn nested_faults(&self) -> &[ListenerFault] {
        &self.nested
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.nested.is_empty() {
            write!(f, " ({} nested fault(s))", self.nested.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for ListenerError {}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<crate::PropertyError> for ListenerError {
    fn from(err: crate::PropertyError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<crate::BindingError> for ListenerError {
    fn from(err: crate::BindingError) -> Self {
        Self::new(err.to_string())
    }
}

/// The kind of listener that faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// An invalidation listener.
    Invalidation,
    /// A scalar change listener.
    Change,
    /// A list change listener.
    ListChange,
    /// A map change listener.
    MapChange,
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalidation => "invalidation",
            Self::Change => "change",
            Self::ListChange => "list-change",
            Self::MapChange => "map-change",
        };
        f.write_str(name)
    }
}

/// A single listener failure captured during dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFault {
    /// Which kind of listener failed.
    pub kind: ListenerKind,
    /// Label of the observable that was dispatching (its name, or its type).
    pub source: String,
    /// The error the listener returned.
    pub error: ListenerError,
}

impl ListenerFault {
    /// Create a fault record.
    #[must_use]
    pub fn new(kind: ListenerKind, source: impl Into<String>, error: ListenerError) -> Self {
        Self {
            kind,
            source: source.into(),
            error,
        }
    }
}

impl fmt::Display for ListenerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} listener on {} failed: {}", self.kind, self.source, self.error)
    }
}

/// Report of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Number of listeners invoked (faulting ones included).
    pub delivered: usize,
    /// Faults captured, in the order the listeners ran.
    pub faults: Vec<ListenerFault>,
}

impl Dispatch {
    /// An empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every listener succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: Dispatch) {
        self.delivered += other.delivered;
        self.faults.extend(other.faults);
    }
}

/// Bounded log of faults retained by an observable.
#[derive(Debug, Clone)]
pub struct FaultLog {
    faults: VecDeque<ListenerFault>,
    capacity: usize,
    dropped: u64,
}

impl FaultLog {
    /// Create a log retaining at most `capacity` faults.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            faults: VecDeque::new(),
            capacity,
            dropped: 0,
        }
    }

    /// Append faults, dropping the oldest past capacity.
    pub fn record(&mut self, faults: Vec<ListenerFault>) {
        for fault in faults {
            if self.capacity == 0 {
                self.dropped += 1;
                continue;
            }
            if self.faults.len() == self.capacity {
                self.faults.pop_front();
                self.dropped += 1;
                tracing::warn!(
                    capacity = self.capacity,
                    "fault log full; dropping oldest listener fault"
                );
            }
            self.faults.push_back(fault);
        }
    }

    /// Remove and return all retained faults.
    pub fn take(&mut self) -> Vec<ListenerFault> {
        self.faults.drain(..).collect()
    }

    /// Number of retained faults.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faults.len()
    }

    /// Whether no faults are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Total faults discarded because the log was full (or disabled).
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
