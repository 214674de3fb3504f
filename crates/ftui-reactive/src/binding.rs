#![forbid(unsafe_code)]

//! Lazily evaluated, memoized values derived from other observables.
//!
//! A [`Binding<T>`] wraps a compute function and the observables it depends
//! on. Invalidation of any dependency marks the binding invalid; the value is
//! recomputed on the next [`get()`](Binding::get).
//!
//! ```ignore
//! let width = Property::new(3);
//! let height = Property::new(4);
//! let area = Binding::new(
//!     { let (w, h) = (width.clone(), height.clone()); move || w.get() * h.get() },
//!     [dependency(&width), dependency(&height)],
//! );
//! assert_eq!(area.get(), 12);
//! width.set(5)?;
//! assert_eq!(area.get(), 20);
//! ```
//!
//! # Invariants
//!
//! 1. The compute function runs at most once per invalidation, and only when
//!    the value is read (or a change listener needs it).
//! 2. Listeners fire on the valid→invalid transition only. Further
//!    invalidations of an already invalid binding are silent.
//! 3. The binding's listener on each dependency holds the binding weakly.
//!    Dropping the last handle (or calling [`dispose`](Binding::dispose))
//!    detaches it.
//! 4. No borrow is held while the compute function runs, so it may read other
//!    bindings and properties freely.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::ObservableConfig;
use crate::fault::{Dispatch, ListenerFault};
use crate::listener::{ChangeListener, InvalidationListener};
use crate::observable::{Observable, ObservableId, ObservableValue, ValueListeners};
use crate::storage;

/// Erase an observable handle into a dependency.
pub fn dependency<O: Observable + Clone + 'static>(observable: &O) -> Rc<dyn Observable> {
    Rc::new(observable.clone())
}

struct BindingState<T> {
    value: Option<T>,
    valid: bool,
}

pub(crate) struct BindingInner<T> {
    compute: Box<dyn Fn() -> T>,
    state: RefCell<BindingState<T>>,
    dependencies: RefCell<Vec<Rc<dyn Observable>>>,
    observer: InvalidationListener,
    notifier: ValueListeners<T>,
}

impl<T> Drop for BindingInner<T> {
    fn drop(&mut self) {
        for dependency in self.dependencies.get_mut().drain(..) {
            dependency.remove_listener(&self.observer);
        }
    }
}

/// A derived value, recomputed lazily after any dependency is invalidated.
///
/// Cloning yields another handle to the same binding.
pub struct Binding<T> {
    inner: Rc<BindingInner<T>>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Binding<T> {
    /// Create a binding over `dependencies`.
    pub fn new(
        compute: impl Fn() -> T + 'static,
        dependencies: impl IntoIterator<Item = Rc<dyn Observable>>,
    ) -> Self {
        Self::with_config(compute, dependencies, ObservableConfig::default())
    }

    /// Create a binding with explicit configuration.
    pub fn with_config(
        compute: impl Fn() -> T + 'static,
        dependencies: impl IntoIterator<Item = Rc<dyn Observable>>,
        config: ObservableConfig,
    ) -> Self {
        let dependencies: Vec<Rc<dyn Observable>> = dependencies.into_iter().collect();
        let inner = Rc::new_cyclic(|weak| BindingInner {
            compute: Box::new(compute),
            state: RefCell::new(BindingState {
                value: None,
                valid: false,
            }),
            dependencies: RefCell::new(Vec::new()),
            observer: InvalidationListener::from_weak(weak.clone(), |inner, _| {
                let binding = Binding {
                    inner: Rc::clone(inner),
                };
                storage::propagate(binding.mark_invalid(), "binding propagation failed")
            }),
            notifier: ValueListeners::new(config),
        });
        for dependency in &dependencies {
            dependency.add_listener(inner.observer.clone());
        }
        *inner.dependencies.borrow_mut() = dependencies;
        Self { inner }
    }

    /// A binding that always yields `value`.
    pub fn constant(value: T) -> Self {
        Self::new(move || value.clone(), [])
    }

    /// The current value, recomputing it if the binding is invalid.
    #[must_use]
    pub fn get(&self) -> T {
        {
            let state = self.inner.state.borrow();
            if state.valid {
                if let Some(value) = &state.value {
                    return value.clone();
                }
            }
        }
        let value = (self.inner.compute)();
        let mut state = self.inner.state.borrow_mut();
        state.value = Some(value.clone());
        state.valid = true;
        value
    }

    /// Whether the cached value is current.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.state.borrow().valid
    }

    /// Mark the binding invalid and notify listeners if it was valid.
    pub fn invalidate(&self) {
        self.mark_invalid();
    }

    /// Detach from every dependency. The binding keeps its last value and
    /// is never invalidated again.
    pub fn dispose(&self) {
        let dependencies = std::mem::take(&mut *self.inner.dependencies.borrow_mut());
        for dependency in &dependencies {
            dependency.remove_listener(&self.inner.observer);
        }
        tracing::trace!(dependencies = dependencies.len(), "binding disposed");
    }

    /// The observables this binding depends on.
    #[must_use]
    pub fn dependencies(&self) -> Vec<Rc<dyn Observable>> {
        self.inner.dependencies.borrow().clone()
    }

    /// Whether both handles refer to the same binding.
    #[must_use]
    pub fn ptr_eq(&self, other: &Binding<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of registered listeners of both kinds.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.notifier.listener_count()
    }

    fn mark_invalid(&self) -> Dispatch {
        let was_valid = std::mem::replace(&mut self.inner.state.borrow_mut().valid, false);
        if was_valid {
            self.inner.notifier.fire(self, self, "Binding")
        } else {
            Dispatch::new()
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable for Binding<T> {
    fn add_listener(&self, listener: InvalidationListener) {
        self.inner.notifier.add_listener(listener);
    }

    fn remove_listener(&self, listener: &InvalidationListener) {
        self.inner.notifier.remove_listener(listener);
    }

    fn observable_id(&self) -> ObservableId {
        ObservableId::of(&self.inner)
    }

    fn take_faults(&self) -> Vec<ListenerFault> {
        self.inner.notifier.take_faults()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> for Binding<T> {
    fn get(&self) -> T {
        Binding::get(self)
    }

    fn add_change_listener(&self, listener: ChangeListener<T>) {
        let current = self.get();
        self.inner.notifier.add_change_listener(listener, current);
    }

    fn remove_change_listener(&self, listener: &ChangeListener<T>) {
        self.inner.notifier.remove_change_listener(listener);
    }
}

impl<T: fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Binding");
        if let Ok(state) = self.inner.state.try_borrow() {
            s.field("value", &state.value).field("valid", &state.valid);
        }
        if let Ok(dependencies) = self.inner.dependencies.try_borrow() {
            s.field("dependencies", &dependencies.len());
        }
        s.finish()
    }
}
