#![forbid(unsafe_code)]

//! Mutable observable state cells.
//!
//! A [`Property<T>`] holds a value and notifies listeners when it is set. It
//! can be bound to another [`ObservableValue<T>`], in which case it tracks the
//! source lazily and rejects direct writes.
//!
//! # Invariants
//!
//! 1. `set()` on an unbound property stores the value, then fires invalidation
//!    listeners unconditionally and change listeners only if the value differs.
//! 2. `set()` on a bound property fails with [`PropertyError::Bound`] and
//!    changes nothing.
//! 3. A bound property is invalidated when its source is; listeners fire only on
//!    the valid→invalid transition. The source is read on the next `get()`.
//! 4. `unbind()` copies the source's current value into the property.
//! 5. A property never keeps its source's listener alive after it is dropped.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `PropertyError::Bound` | `set()` while bound | No change, no notification |
//! | `PropertyError::SelfBinding` | `bind()` to itself | No change |
//! | Listener fault | A listener returned `Err` | Recorded, see [`Observable::take_faults`] |

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bidirectional::BidirectionalBinding;
use crate::config::ObservableConfig;
use crate::error::{BindingError, PropertyError};
use crate::fault::{Dispatch, ListenerFault};
use crate::listener::{ChangeListener, InvalidationListener};
use crate::observable::{
    Observable, ObservableId, ObservableValue, ValueListeners, WritableValue,
};
use crate::storage::{self, StorageKind};

pub type BooleanProperty = Property<bool>;
pub type IntegerProperty = Property<i32>;
pub type LongProperty = Property<i64>;
pub type FloatProperty = Property<f32>;
pub type DoubleProperty = Property<f64>;
pub type StringProperty = Property<String>;
pub type ObjectProperty<T> = Property<T>;

struct BoundSource<T> {
    observable: Rc<dyn ObservableValue<T>>,
    id: ObservableId,
    listener: InvalidationListener,
}

struct PropertyState<T> {
    value: T,
    valid: bool,
    source: Option<BoundSource<T>>,
}

pub(crate) struct PropertyInner<T> {
    name: Option<String>,
    state: RefCell<PropertyState<T>>,
    notifier: ValueListeners<T>,
}

impl<T> Drop for PropertyInner<T> {
    fn drop(&mut self) {
        if let Some(bound) = self.state.get_mut().source.take() {
            bound.observable.remove_listener(&bound.listener);
        }
    }
}

/// A mutable, observable value.
///
/// Cloning yields another handle to the same property.
pub struct Property<T> {
    inner: Rc<PropertyInner<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    /// Create an unbound property.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::build(None, value, ObservableConfig::default())
    }

    /// Create a property with a name used in errors, logs, and `Debug`.
    #[must_use]
    pub fn named(name: impl Into<String>, value: T) -> Self {
        Self::build(Some(name.into()), value, ObservableConfig::default())
    }

    /// Create a property with explicit configuration.
    #[must_use]
    pub fn with_config(value: T, config: ObservableConfig) -> Self {
        Self::build(None, value, config)
    }

    /// Create a named property with explicit configuration.
    #[must_use]
    pub fn named_with_config(name: impl Into<String>, value: T, config: ObservableConfig) -> Self {
        Self::build(Some(name.into()), value, config)
    }

    fn build(name: Option<String>, value: T, config: ObservableConfig) -> Self {
        Self {
            inner: Rc::new(PropertyInner {
                name,
                state: RefCell::new(PropertyState {
                    value,
                    valid: true,
                    source: None,
                }),
                notifier: ValueListeners::new(config),
            }),
        }
    }

    /// The property's name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    fn label(&self) -> &str {
        self.inner.name.as_deref().unwrap_or("Property")
    }

    /// The current value. A bound property reads its source if it is invalid.
    #[must_use]
    pub fn get(&self) -> T {
        let source = {
            let state = self.inner.state.borrow();
            match &state.source {
                Some(bound) if !state.valid => Rc::clone(&bound.observable),
                _ => return state.value.clone(),
            }
        };
        let value = source.get();
        let mut state = self.inner.state.borrow_mut();
        state.value = value.clone();
        state.valid = true;
        value
    }

    /// Store a new value and notify listeners.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::Bound`] if the property is bound.
    pub fn set(&self, value: T) -> Result<(), PropertyError> {
        self.set_reporting(value).map(drop)
    }

    /// Like [`set`](Self::set), returning the report of the dispatch it caused.
    pub(crate) fn set_reporting(&self, value: T) -> Result<Dispatch, PropertyError> {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.source.is_some() {
                return Err(PropertyError::Bound {
                    name: self.label().to_owned(),
                });
            }
            state.value = value;
            state.valid = true;
        }
        Ok(self.fire())
    }

    /// Whether the property tracks a bound source.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.state.borrow().source.is_some()
    }

    /// Track `source`. Replaces any previous source.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::SelfBinding`] if `source` is this property.
    pub fn bind<O>(&self, source: &O) -> Result<(), PropertyError>
    where
        O: ObservableValue<T> + Clone + 'static,
    {
        let id = source.observable_id();
        if id == self.observable_id() {
            return Err(PropertyError::SelfBinding {
                name: self.label().to_owned(),
            });
        }
        if self
            .inner
            .state
            .borrow()
            .source
            .as_ref()
            .is_some_and(|bound| bound.id == id)
        {
            return Ok(());
        }

        let listener = InvalidationListener::weak(&self.inner, |inner, _| {
            let property = Property {
                inner: Rc::clone(inner),
            };
            storage::propagate(property.mark_invalid(), "bound property propagation failed")
        });
        let observable: Rc<dyn ObservableValue<T>> = Rc::new(source.clone());
        let previous = self.inner.state.borrow_mut().source.replace(BoundSource {
            observable,
            id,
            listener: listener.clone(),
        });
        if let Some(previous) = previous {
            previous.observable.remove_listener(&previous.listener);
        }
        source.add_listener(listener);

        tracing::trace!(property = self.label(), source = %id, "bound");
        self.mark_invalid();
        Ok(())
    }

    /// Stop tracking the bound source, keeping its current value.
    pub fn unbind(&self) {
        let Some(bound) = self.inner.state.borrow_mut().source.take() else {
            return;
        };
        let value = bound.observable.get();
        {
            let mut state = self.inner.state.borrow_mut();
            state.value = value;
            state.valid = true;
        }
        bound.observable.remove_listener(&bound.listener);
        tracing::trace!(property = self.label(), source = %bound.id, "unbound");
    }

    /// Keep this property and `other` synchronized in both directions.
    ///
    /// # Errors
    ///
    /// See [`BidirectionalBinding::bind`].
    pub fn bind_bidirectional(
        &self,
        other: &Property<T>,
    ) -> Result<BidirectionalBinding<T>, BindingError> {
        BidirectionalBinding::bind(self, other)
    }

    /// Remove a bidirectional binding between this property and `other`.
    ///
    /// # Errors
    ///
    /// See [`BidirectionalBinding::unbind`].
    pub fn unbind_bidirectional(&self, other: &Property<T>) -> Result<(), BindingError> {
        BidirectionalBinding::unbind(self, other)
    }

    /// A read-only view of this property.
    #[must_use]
    pub fn read_only(&self) -> ReadOnlyProperty<T> {
        ReadOnlyProperty {
            property: self.clone(),
        }
    }

    /// A weak handle that does not keep the property alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakProperty<T> {
        WeakProperty {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same property.
    #[must_use]
    pub fn ptr_eq(&self, other: &Property<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of registered listeners of both kinds.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.notifier.listener_count()
    }

    /// Current listener storage representation.
    #[must_use]
    pub fn storage_kind(&self) -> StorageKind {
        self.inner.notifier.storage_kind()
    }

    fn mark_invalid(&self) -> Dispatch {
        let was_valid = std::mem::replace(&mut self.inner.state.borrow_mut().valid, false);
        if was_valid {
            self.fire()
        } else {
            Dispatch::new()
        }
    }

    fn fire(&self) -> Dispatch {
        self.inner.notifier.fire(self, self, self.label())
    }

    #[cfg(test)]
    pub(crate) fn notifier(&self) -> &ValueListeners<T> {
        &self.inner.notifier
    }
}

impl<T: Clone + PartialEq + 'static> Observable for Property<T> {
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

impl<T: Clone + PartialEq + 'static> ObservableValue<T> for Property<T> {
    fn get(&self) -> T {
        Property::get(self)
    }

    fn add_change_listener(&self, listener: ChangeListener<T>) {
        let current = self.get();
        self.inner.notifier.add_change_listener(listener, current);
    }

    fn remove_change_listener(&self, listener: &ChangeListener<T>) {
        self.inner.notifier.remove_change_listener(listener);
    }
}

impl<T: Clone + PartialEq + 'static> WritableValue<T> for Property<T> {
    fn set_value(&self, value: T) -> Result<(), PropertyError> {
        self.set(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Property");
        if let Some(name) = &self.inner.name {
            s.field("name", name);
        }
        match self.inner.state.try_borrow() {
            Ok(state) => s
                .field("value", &state.value)
                .field("valid", &state.valid)
                .field("bound", &state.source.is_some()),
            Err(_) => s.field("value", &"<borrowed>"),
        };
        s.finish()
    }
}

/// Weak handle to a [`Property`].
pub struct WeakProperty<T> {
    inner: Weak<PropertyInner<T>>,
}

impl<T> Clone for WeakProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakProperty<T> {
    /// The property, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Property<T>> {
        self.inner.upgrade().map(|inner| Property { inner })
    }
}

impl<T> fmt::Debug for WeakProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakProperty")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Read-only handle onto a [`Property`].
pub struct ReadOnlyProperty<T> {
    property: Property<T>,
}

impl<T> Clone for ReadOnlyProperty<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> ReadOnlyProperty<T> {
    /// The current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.property.get()
    }

    /// The underlying property's name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.property.name()
    }
}

impl<T: Clone + PartialEq + 'static> Observable for ReadOnlyProperty<T> {
    fn add_listener(&self, listener: InvalidationListener) {
        self.property.add_listener(listener);
    }

    fn remove_listener(&self, listener: &InvalidationListener) {
        self.property.remove_listener(listener);
    }

    fn observable_id(&self) -> ObservableId {
        self.property.observable_id()
    }

    fn take_faults(&self) -> Vec<ListenerFault> {
        self.property.take_faults()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> for ReadOnlyProperty<T> {
    fn get(&self) -> T {
        self.property.get()
    }

    fn add_change_listener(&self, listener: ChangeListener<T>) {
        self.property.add_change_listener(listener);
    }

    fn remove_change_listener(&self, listener: &ChangeListener<T>) {
        self.property.remove_change_listener(listener);
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadOnlyProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnlyProperty").field(&self.property).finish()
    }
}
