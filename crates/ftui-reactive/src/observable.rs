#![forbid(unsafe_code)]

//! Observable contracts and scalar notification plumbing.
//!
//! - [`Observable`]: a notification channel for invalidation listeners.
//! - [`ObservableValue<T>`]: an observable that also exposes a current value
//!   and accepts change listeners.
//! - [`WritableValue<T>`]: a value that can be set.
//!
//! [`ValueListeners<T>`] bundles what every scalar observable needs to notify:
//! an [`ExpressionHelper<T>`] (listener storage plus the last value seen by
//! change listeners), a bounded [`FaultLog`], and the [`ObservableConfig`].
//!
//! # Invariants
//!
//! 1. Invalidation listeners fire on every notification.
//! 2. Change listeners fire only when the value observed now differs from the
//!    value they last saw. The new value is read after the invalidation
//!    listeners ran, so lazily computed sources are evaluated at most once.
//! 3. No `RefCell` borrow of the notifier is held while a listener runs.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::ObservableConfig;
use crate::error::PropertyError;
use crate::fault::{Dispatch, FaultLog, ListenerFault, ListenerKind};
use crate::listener::{ChangeListener, InvalidationListener};
use crate::storage::{DispatchSite, ListenerSet, ListenerSnapshot, StorageKind};

/// Address identity of an observable.
///
/// Stable for the lifetime of the observable's shared state. Used for
/// self-binding checks and for bidirectional binding equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservableId(usize);

impl ObservableId {
    /// Identity of the value behind `rc`.
    #[must_use]
    pub fn of<T: ?Sized>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc).cast::<()>() as usize)
    }

    /// Build an identity from a raw value.
    #[must_use]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw value.
    #[must_use]
    pub const fn into_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// Something that can be invalidated.
pub trait Observable {
    /// Register an invalidation listener. Registering the same listener twice
    /// makes it fire twice.
    fn add_listener(&self, listener: InvalidationListener);

    /// Remove one registration equal to `listener`. Unknown listeners are ignored.
    fn remove_listener(&self, listener: &InvalidationListener);

    /// Address identity of this observable.
    fn observable_id(&self) -> ObservableId;

    /// Drain the faults recorded by this observable's own dispatches.
    fn take_faults(&self) -> Vec<ListenerFault> {
        Vec::new()
    }
}

/// An observable with a current value.
pub trait ObservableValue<T>: Observable {
    /// The current value.
    fn get(&self) -> T;

    /// Alias of [`get`](Self::get).
    fn get_value(&self) -> T {
        self.get()
    }

    /// Register a change listener.
    fn add_change_listener(&self, listener: ChangeListener<T>);

    /// Remove one registration equal to `listener`.
    fn remove_change_listener(&self, listener: &ChangeListener<T>);
}

/// A value that can be written.
pub trait WritableValue<T> {
    /// Set the value.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::Bound`] if the value tracks a bound source.
    fn set_value(&self, value: T) -> Result<(), PropertyError>;
}

/// Listener storage for scalar observables.
///
/// Besides the listeners it remembers the value change listeners last saw,
/// which is the `old` argument of the next change notification.
#[derive(Debug)]
pub struct ExpressionHelper<T> {
    listeners: ListenerSet<ChangeListener<T>>,
    current: Option<T>,
}

impl<T: 'static> ExpressionHelper<T> {
    /// Create empty storage.
    #[must_use]
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            listeners: ListenerSet::new(initial_capacity),
            current: None,
        }
    }

    /// Register an invalidation listener.
    pub fn add_listener(&mut self, listener: InvalidationListener) {
        self.listeners.add_invalidation(listener);
    }

    /// Remove an invalidation listener.
    pub fn remove_listener(&mut self, listener: &InvalidationListener) -> bool {
        self.listeners.remove_invalidation(listener)
    }

    /// Register a change listener; `current` becomes the baseline value.
    pub fn add_change_listener(&mut self, listener: ChangeListener<T>, current: T) {
        self.listeners.add_change(listener);
        self.current = Some(current);
    }

    /// Remove a change listener. The baseline is dropped with the last one.
    pub fn remove_change_listener(&mut self, listener: &ChangeListener<T>) -> bool {
        let removed = self.listeners.remove_change(listener);
        if !self.listeners.has_change_listeners() {
            self.current = None;
        }
        removed
    }

    /// Replace the baseline, returning the previous one.
    pub fn exchange_current(&mut self, value: T) -> Option<T> {
        self.current.replace(value)
    }

    /// The underlying listener set.
    #[must_use]
    pub fn listeners(&self) -> &ListenerSet<ChangeListener<T>> {
        &self.listeners
    }

    /// Capture the listeners for dispatch.
    #[must_use]
    pub fn snapshot(&self) -> ListenerSnapshot<ChangeListener<T>> {
        self.listeners.snapshot()
    }
}

/// Notification state embedded in every scalar observable.
pub struct ValueListeners<T> {
    helper: RefCell<ExpressionHelper<T>>,
    faults: RefCell<FaultLog>,
    config: ObservableConfig,
}

impl<T: Clone + PartialEq + 'static> ValueListeners<T> {
    /// Create notifier state for `config`.
    #[must_use]
    pub fn new(config: ObservableConfig) -> Self {
        Self {
            helper: RefCell::new(ExpressionHelper::new(config.initial_listener_capacity)),
            faults: RefCell::new(FaultLog::new(config.fault_capacity)),
            config,
        }
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> ObservableConfig {
        self.config
    }

    /// Register an invalidation listener.
    pub fn add_listener(&self, listener: InvalidationListener) {
        self.helper.borrow_mut().add_listener(listener);
    }

    /// Remove an invalidation listener.
    pub fn remove_listener(&self, listener: &InvalidationListener) {
        self.helper.borrow_mut().remove_listener(listener);
    }

    /// Register a change listener with the value it starts observing from.
    pub fn add_change_listener(&self, listener: ChangeListener<T>, current: T) {
        self.helper.borrow_mut().add_change_listener(listener, current);
    }

    /// Remove a change listener.
    pub fn remove_change_listener(&self, listener: &ChangeListener<T>) {
        self.helper.borrow_mut().remove_change_listener(listener);
    }

    /// Number of registered listeners of both kinds.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.helper.borrow().listeners().len()
    }

    /// Current storage representation.
    #[must_use]
    pub fn storage_kind(&self) -> StorageKind {
        self.helper.borrow().listeners().kind()
    }

    /// Drain recorded faults.
    pub fn take_faults(&self) -> Vec<ListenerFault> {
        self.faults.borrow_mut().take()
    }

    /// Notify listeners that `value_source` may have changed.
    ///
    /// `observable` and `value_source` are the same object seen through its
    /// two traits. The returned report's faults are also recorded in the log.
    pub fn fire(
        &self,
        observable: &dyn Observable,
        value_source: &dyn ObservableValue<T>,
        label: &str,
    ) -> Dispatch {
        let snapshot = self.helper.borrow().snapshot();
        if snapshot.is_empty() {
            return Dispatch::new();
        }
        let site = DispatchSite::new(observable, label, self.config.log_faults);
        let mut report = snapshot.dispatch_invalidation(&site);

        if snapshot.has_change_listeners() {
            let new = value_source.get();
            let old = self.helper.borrow_mut().exchange_current(new.clone());
            if let Some(old) = old.filter(|old| *old != new) {
                report.merge(snapshot.dispatch_change(&site, ListenerKind::Change, |listener| {
                    listener.changed(value_source, &old, &new)
                }));
            }
        }

        if !report.faults.is_empty() {
            self.faults.borrow_mut().record(report.faults.clone());
        }
        report
    }
}

impl<T> fmt::Debug for ValueListeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueListeners")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
